pub mod category;
pub mod fields;

pub use category::{ParseCategoryError, ReceiptCategory, UpiApp};
pub use fields::{ExtractedFields, ReceiptField, NOT_FOUND};
