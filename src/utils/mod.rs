//! Utility functions and types

pub mod data_loader;
pub mod frame;

pub use data_loader::{DataLoader, DataSaver, FileFormat};
pub use frame::{column_to_array1, columns_to_array2, split_features_target};
