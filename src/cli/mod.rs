pub mod args;

use clap::Parser;
pub use args::{Action, Arguments, IndexArgs, ProcessArgs};

pub fn parse() -> Arguments {
    Arguments::parse()
}
