pub mod batch;
pub mod normalize;
pub mod padding;
pub mod resize;
