use std::fs;
use std::sync::OnceLock;

use hedcheck::schema::Schema;

mod properties;
mod samples;
mod scenarios;

pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        let content = fs::read_to_string("tests/schemas/standard.json")
            .expect("Failed to read fixture schema");
        Schema::from_json(&content).expect("Failed to build fixture schema")
    })
}
