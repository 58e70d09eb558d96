pub use clockin_common::{Error, FromMessage};

pub type Result<T> = std::result::Result<T, Error>;

clockin_common::impl_context!();
