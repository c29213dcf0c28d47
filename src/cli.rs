use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the ingredient catalog CSV file
    #[arg(short, long)]
    pub ingredients_file: String,

    /// Animal type key in the requirement table
    #[arg(short, long, default_value = "dairy-cattle")]
    pub animal: String,

    /// Age group key within the animal type
    #[arg(long, default_value = "calf")]
    pub age: String,

    /// Optional JSON file with requirement overrides, merged over the
    /// built-in table
    #[arg(short, long)]
    pub requirements_file: Option<String>,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
