//! Prints the EFKStack CustomResourceDefinition as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/efkstack.yaml`

use anyhow::Result;
use crds::EFKStack;
use kube::CustomResourceExt;

fn main() -> Result<()> {
    print!("{}", serde_yaml::to_string(&EFKStack::crd())?);
    Ok(())
}
