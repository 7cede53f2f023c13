use std::env;

/// Build-time mesh defaults: (variable, fallback)
const MESH_ENV: [(&str, &str); 4] = [
    ("RBC_MESH_ACCESS_ADDR", "0x8E89BED6"),
    ("RBC_MESH_CHANNEL", "38"),
    ("RBC_MESH_HANDLE_COUNT", "32"),
    ("RBC_MESH_ADV_INT_MS", "100"),
];

fn main() {
    // Network parameters baked into the image. `parameters::MeshParams`
    // parses them; `init` still validates at runtime.
    for (name, fallback) in MESH_ENV {
        match env::var(name) {
            Ok(value) => {
                println!("cargo:rustc-env={}={}", name, value);
                println!("cargo:warning=Using {} from environment: {}", name, value);
            }
            Err(_) => println!("cargo:rustc-env={}={}", name, fallback),
        }
        println!("cargo:rerun-if-env-changed={}", name);
    }
}
