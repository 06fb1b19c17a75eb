use std::{fmt, str::FromStr};

use sea_orm::{Set, entity::prelude::*};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employee")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub department: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Columns a client may overwrite after creation. `id` is deliberately absent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MutableField {
    Name,
    Department,
}

impl MutableField {
    pub const ALL: [MutableField; 2] = [MutableField::Name, MutableField::Department];

    pub fn as_str(&self) -> &'static str {
        match self {
            MutableField::Name => "name",
            MutableField::Department => "department",
        }
    }

    /// Writes `value` into the matching slot of an active model.
    pub fn assign(&self, model: &mut ActiveModel, value: String) {
        match self {
            MutableField::Name => model.name = Set(value),
            MutableField::Department => model.department = Set(value),
        }
    }
}

impl fmt::Display for MutableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("column '{0}' cannot be updated; expected one of: name, department")]
pub struct UnknownField(pub String);

impl FromStr for MutableField {
    type Err = UnknownField;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        MutableField::ALL
            .into_iter()
            .find(|field| field.as_str() == raw)
            .ok_or_else(|| UnknownField(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_allow_listed_columns() {
        assert_eq!("name".parse::<MutableField>(), Ok(MutableField::Name));
        assert_eq!(
            "department".parse::<MutableField>(),
            Ok(MutableField::Department)
        );
    }

    #[test]
    fn rejects_identity_and_unknown_columns() {
        for raw in ["id", "Name", "salary", "", "name; DROP TABLE employee"] {
            let err = raw.parse::<MutableField>().unwrap_err();
            assert_eq!(err, UnknownField(raw.to_string()));
        }
    }

    #[test]
    fn assign_only_touches_selected_column() {
        let mut model = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Alice".into()),
            department: Set("Eng".into()),
        };
        MutableField::Department.assign(&mut model, "Sales".into());
        assert_eq!(model.department.as_ref(), "Sales");
        assert_eq!(model.name.as_ref(), "Alice");
    }
}
