pub mod collection;
pub mod family;
pub mod item;
pub mod schema;
