pub mod config;
pub mod error;
pub mod io;
pub mod locale;
pub mod model;
pub mod params;
