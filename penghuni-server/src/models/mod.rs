mod house;

pub use house::*;
