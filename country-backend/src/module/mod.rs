pub mod country;
pub mod refresh;
pub mod renderer;
pub mod sources;
