pub mod citation;
pub mod mention;
pub mod normalize;
pub mod similarity;
pub mod tag_type;

pub use tag_type::TagType;
