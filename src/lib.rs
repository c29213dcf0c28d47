pub mod cli;
pub mod ingredient;
pub mod requirements;
pub mod data_loader;
pub mod formula;
pub mod nutrient_aggregator;
pub mod optim;
