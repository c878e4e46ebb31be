//! Convenience wrapper that owns a [`Config`] and drives model building,
//! loading and address generation.
//!
//! For full control, import from [`kernel`](crate::kernel) and
//! [`model`](crate::model) directly.

use crate::config::Config;
use crate::error::Result;
use crate::highlevel::files::{read_addresses, write_hex_file};
use crate::kernel::Ipv6Network;
use crate::model::{ClusterModel, ModelBuilder, Sampler};
use std::net::Ipv6Addr;
use std::path::Path;
use tracing::info;

/// Convenience wrapper over the model layer.
///
/// # When to use `AddrGen` vs direct imports
///
/// | Use case | Recommendation |
/// |----------|---------------|
/// | File-to-file workflows, scripts | `AddrGen` |
/// | Custom corpus indexes, seeded or threaded sampling | [`ModelBuilder`] / [`Sampler`] |
///
/// # Example
///
/// ```rust
/// use addrgen::{AddrGen, Config};
/// use std::net::Ipv6Addr;
///
/// let gen = AddrGen::new(Config::default()).unwrap();
/// let corpus: Vec<Ipv6Addr> = (0..16u128)
///     .map(|i| Ipv6Addr::from(0x2001_0db8_u128 << 96 | i))
///     .collect();
/// let model = gen.build_model(&corpus).unwrap();
///
/// let addrs = gen.generate(&model, 8, Some("2001:db8::/32")).unwrap();
/// assert_eq!(addrs.len(), 8);
/// ```
#[derive(Clone, Debug)]
pub struct AddrGen {
    config: Config,
}

impl AddrGen {
    /// Create a client after validating `config`.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Models
    // =========================================================================

    pub fn build_model(&self, addrs: &[Ipv6Addr]) -> Result<ClusterModel> {
        ModelBuilder::new(self.config.clone())?.build(addrs)
    }

    /// Read a corpus file and build a model from it.
    pub fn build_model_from_file<P: AsRef<Path>>(&self, path: P) -> Result<ClusterModel> {
        self.build_model(&read_addresses(path)?)
    }

    /// Load a saved model and apply this client's pool parameters.
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<ClusterModel> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading cluster model");
        Ok(ClusterModel::load(path)?.with_config(&self.config))
    }

    // =========================================================================
    // Generation
    // =========================================================================

    /// `count` unique addresses, optionally restricted to `network`
    /// (`addr/len` text).
    pub fn generate(
        &self,
        model: &ClusterModel,
        count: usize,
        network: Option<&str>,
    ) -> Result<Vec<Ipv6Addr>> {
        let mut sampler = Sampler::new(model, &self.config);
        match network {
            None => {
                info!(count, "generating addresses in the global address space");
                sampler.generate(count)
            }
            Some(text) => {
                let network: Ipv6Network = text.parse()?;
                info!(count, %network, "generating addresses in network");
                sampler.generate_in_network(count, &network)
            }
        }
    }

    /// Load the model at `model_path`, generate `count` addresses and write
    /// them to `output_path` in hex form.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        model_path: P,
        output_path: Q,
        network: Option<&str>,
        count: usize,
    ) -> Result<Vec<Ipv6Addr>> {
        let model = self.load_model(model_path)?;
        let addrs = self.generate(&model, count, network)?;
        write_hex_file(output_path, &addrs)?;
        Ok(addrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, GenError};
    use crate::highlevel::files::read_addresses;

    fn corpus() -> Vec<Ipv6Addr> {
        let mut addrs: Vec<Ipv6Addr> = (0..16u128)
            .map(|i| Ipv6Addr::from(0x2001_0db8_u128 << 96 | 0x100 | i))
            .collect();
        addrs.push("fe80::1".parse().unwrap());
        addrs
    }

    #[test]
    fn test_build_save_run() {
        let gen = AddrGen::new(Config::default()).unwrap();
        let model = gen.build_model(&corpus()).unwrap();
        assert_eq!(model.cluster_set().len(), 1);

        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        let out_path = dir.path().join("out.txt");
        model.save(&model_path).unwrap();

        let addrs = gen.run(&model_path, &out_path, None, 10).unwrap();
        assert_eq!(addrs.len(), 10);
        assert_eq!(read_addresses(&out_path).unwrap(), addrs);
        let pattern = *model.cluster_set().clusters()[0].pattern();
        assert!(addrs.iter().all(|a| pattern.matches(a)));
    }

    #[test]
    fn test_build_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        let text: String = corpus().iter().map(|a| format!("{a}\n")).collect();
        std::fs::write(&path, text).unwrap();

        let gen = AddrGen::new(Config::default()).unwrap();
        let model = gen.build_model_from_file(&path).unwrap();
        assert_eq!(model, gen.build_model(&corpus()).unwrap());
        assert_eq!(model.nybble_counts().total(), 1);
    }

    #[test]
    fn test_generate_network_errors() {
        let gen = AddrGen::new(Config::default()).unwrap();
        let model = gen.build_model(&corpus()).unwrap();

        let err = gen.generate(&model, 4, Some("2001:db8::/37")).unwrap_err();
        assert!(matches!(err, GenError::InvalidPrefixLength(37)));

        let err = gen.generate(&model, 4, Some("not a network")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let addrs = gen.generate(&model, 4, Some("3fff::/16")).unwrap();
        let network: Ipv6Network = "3fff::/16".parse().unwrap();
        assert!(addrs.iter().all(|a| network.contains(a)));
    }

    #[test]
    fn test_missing_model_file() {
        let gen = AddrGen::new(Config::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = gen
            .run(dir.path().join("absent.json"), dir.path().join("out.txt"), None, 1)
            .unwrap_err();
        assert!(matches!(err, GenError::Io(_)));
        assert!(!dir.path().join("out.txt").exists());
    }
}
