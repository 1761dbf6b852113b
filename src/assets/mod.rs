//! Asset Loading
//!
//! File parsing that turns on-disk model data into [`Model`](crate::Model)
//! resources. Loading is blocking and synchronous on the rendering thread;
//! it either completes or fails, never partially.

pub(crate) mod gltf;
