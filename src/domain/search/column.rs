use serde::{Deserialize, Serialize};

use crate::domain::semantic_key::Attribute;

/// Whitelisted contact-store columns. Only these names ever reach a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    FullName,
    GivenNames,
    PaternalSurname,
    MaternalSurname,
    Phone,
    Mobile,
    Email,
    Address,
    Role,
    Workplace,
    Zone,
    Education,
    MaritalStatus,
    StartDate,
    DoublePost,
}

impl Column {
    pub const ALL: [Column; 15] = [
        Column::FullName,
        Column::GivenNames,
        Column::PaternalSurname,
        Column::MaternalSurname,
        Column::Phone,
        Column::Mobile,
        Column::Email,
        Column::Address,
        Column::Role,
        Column::Workplace,
        Column::Zone,
        Column::Education,
        Column::MaritalStatus,
        Column::StartDate,
        Column::DoublePost,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::FullName => "full_name",
            Self::GivenNames => "given_names",
            Self::PaternalSurname => "paternal_surname",
            Self::MaternalSurname => "maternal_surname",
            Self::Phone => "phone",
            Self::Mobile => "mobile",
            Self::Email => "email",
            Self::Address => "address",
            Self::Role => "role",
            Self::Workplace => "workplace",
            Self::Zone => "zone",
            Self::Education => "education",
            Self::MaritalStatus => "marital_status",
            Self::StartDate => "start_date",
            Self::DoublePost => "double_post",
        }
    }

    /// Columns that answer a question about the attribute
    pub fn for_attribute(attribute: Attribute) -> &'static [Column] {
        match attribute {
            Attribute::Identity => &[
                Column::Role,
                Column::Workplace,
                Column::Zone,
                Column::Phone,
                Column::Email,
            ],
            Attribute::Phone => &[Column::Phone, Column::Mobile],
            Attribute::Email => &[Column::Email],
            Attribute::Address => &[Column::Address],
            Attribute::Role => &[Column::Role],
            Attribute::Zone => &[Column::Zone],
            Attribute::Workplace => &[Column::Workplace],
            Attribute::Education => &[Column::Education],
            Attribute::MaritalStatus => &[Column::MaritalStatus],
            Attribute::StartDate => &[Column::StartDate],
            Attribute::DoublePost => &[Column::DoublePost],
        }
    }

    /// Column a filter on the attribute compares against
    pub fn filtered_by(attribute: Attribute) -> Column {
        match attribute {
            Attribute::Identity => Column::FullName,
            other => Self::for_attribute(other)[0],
        }
    }
}
