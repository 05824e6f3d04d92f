pub mod chunk;
pub mod decision;
pub mod grid_manager;
pub mod leaf_mask;
pub mod mask;
pub mod pixel;
pub mod pixel_grid;
pub mod texture;
pub mod utils;
