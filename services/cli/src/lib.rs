mod cli;
mod evaluate;
mod render;

use calleval::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
