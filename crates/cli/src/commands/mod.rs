pub mod merge;
pub mod normalize;
pub mod restore;
pub mod status;
pub mod strip;
