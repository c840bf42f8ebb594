//! Prints the Central CRD as YAML
//!
//! ```sh
//! cargo run -p crds --bin crdgen > config/crd/central.yaml
//! ```

use crds::Central;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let yaml = serde_yaml::to_string(&Central::crd())?;
    print!("{yaml}");
    Ok(())
}
