//! Validators backing the constraints declared in [`crate::constraint`].

pub mod not_blank;
pub mod unique_url;
