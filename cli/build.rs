/// Rebuild when the embedded Terraform templates change.
///
/// `include_dir!()` does not register the files it embeds with cargo on
/// stable, so edits under `templates/` would otherwise be missed by
/// incremental builds.
fn main() {
    println!("cargo::rerun-if-changed=templates");
}
