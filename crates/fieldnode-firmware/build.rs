//! Injects deployment secrets from a `.env` file as compile-time variables.
//!
//! Values already set in the build environment take precedence over the file.

const REQUIRED: [&str; 3] = [
    "FIELDNODE_WIFI_SSID",
    "FIELDNODE_WIFI_PASSWORD",
    "FIELDNODE_DATABASE_URL",
];

const OPTIONAL: [&str; 2] = ["FIELDNODE_DATABASE_SECRET", "FIELDNODE_GEOLOCATION_KEY"];

fn main() {
    println!("cargo:rustc-link-arg=-Tlinkall.x");
    println!("cargo:rerun-if-changed=.env");

    // Loads into the process environment without overriding existing values.
    let _ = dotenvy::dotenv();

    for key in REQUIRED.iter().chain(OPTIONAL.iter()) {
        println!("cargo:rerun-if-env-changed={key}");
        match std::env::var(key) {
            Ok(value) => println!("cargo:rustc-env={key}={value}"),
            Err(_) if OPTIONAL.contains(key) => println!("cargo:rustc-env={key}="),
            Err(_) => println!("cargo:warning={key} is not set; add it to .env"),
        }
    }
}
