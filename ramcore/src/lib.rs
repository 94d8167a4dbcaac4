// algorithm module
pub mod algorithm {
    pub mod banded;
    pub mod baseline;
    pub mod peak;
}

// data module
pub mod data {
    pub mod spectrum;
    pub mod synthetic;
}

// spectrum preparation for reference libraries
pub mod processing;

pub mod error;

pub use error::RamanError;
