mod aggregate;
mod checks;
