//! Prints the FOLIO OpenAPI document as JSON on stdout.
//!
//! Usage:
//!   cargo run -p folio-api --bin generate-openapi > openapi.json

use folio_api::ApiDoc;

fn main() {
    match ApiDoc::to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI spec: {}", e);
            std::process::exit(1);
        }
    }
}
