use std::env;

fn main() {
    // Version string shown by `mediagrab --version`, with the git describe
    // suffix when the build happens inside a checkout.
    let pkg_version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let version = match std::process::Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .output()
    {
        Ok(out) if out.status.success() => {
            let describe = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if describe.is_empty() {
                pkg_version
            } else {
                format!("{pkg_version} ({describe})")
            }
        }
        _ => pkg_version,
    };
    println!("cargo:rustc-env=MEDIAGRAB_VERSION={version}");

    println!("cargo:rerun-if-changed=src/");
    println!("cargo:rerun-if-changed=Cargo.toml");
}
