//! Initial values for a fit.
//!
//! User supplied values are looked up per parameter block and mapped to the
//! unconstrained space by the model. Blocks without a supplied value are
//! drawn uniformly from `[-radius, radius]`, or set to zero if the radius
//! is zero.

use std::collections::{BTreeMap, HashMap, HashSet};

use rand::Rng;

use crate::{math::all_finite, model::Model, writer::Writer, ConfigError, FitError};

/// Named initial values on the constrained scale.
pub trait InitSource {
    /// The values for the parameter block `name`, if any were provided.
    fn get(&self, name: &str) -> Option<&[f64]>;
}

/// An init source without any values.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInits;

impl InitSource for NoInits {
    fn get(&self, _name: &str) -> Option<&[f64]> {
        None
    }
}

impl InitSource for HashMap<String, Vec<f64>> {
    fn get(&self, name: &str) -> Option<&[f64]> {
        HashMap::get(self, name).map(|values| values.as_slice())
    }
}

impl InitSource for BTreeMap<String, Vec<f64>> {
    fn get(&self, name: &str) -> Option<&[f64]> {
        BTreeMap::get(self, name).map(|values| values.as_slice())
    }
}

impl<I: InitSource + ?Sized> InitSource for &I {
    fn get(&self, name: &str) -> Option<&[f64]> {
        (**self).get(name)
    }
}

/// Column names for the unconstrained coordinates of the given blocks.
pub fn unconstrained_names(blocks: &[(String, usize)]) -> Vec<String> {
    blocks
        .iter()
        .flat_map(|(name, len)| {
            let len = *len;
            (0..len).map(move |i| {
                if len == 1 {
                    name.clone()
                } else {
                    format!("{}.{}", name, i + 1)
                }
            })
        })
        .collect()
}

/// Build the initial unconstrained position and record it in `init_writer`.
///
/// Every check happens before the first write, so a [`ConfigError`] leaves
/// `init_writer` untouched.
pub fn initialize<M, I, R>(
    model: &M,
    inits: &I,
    rng: &mut R,
    radius: f64,
    init_writer: &mut dyn Writer,
) -> Result<Vec<f64>, FitError>
where
    M: Model + ?Sized,
    I: InitSource + ?Sized,
    R: Rng + ?Sized,
{
    if !radius.is_finite() || radius < 0. {
        return Err(ConfigError::InvalidRadius(radius).into());
    }

    let dim = model.dim();
    let blocks = model.parameter_blocks();
    let found: usize = blocks.iter().map(|(_, len)| len).sum();
    if found != dim {
        return Err(ConfigError::DimensionMismatch {
            expected: dim,
            found,
        }
        .into());
    }
    let mut seen = HashSet::new();
    for (name, _) in blocks.iter() {
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::DuplicateBlock(name.clone()).into());
        }
    }

    let mut position = vec![0f64; dim];
    let mut start = 0;
    for (name, len) in blocks.iter() {
        let block = &mut position[start..start + len];
        start += len;

        match inits.get(name) {
            Some(values) => {
                if !all_finite(values) {
                    return Err(ConfigError::NonFiniteInit { name: name.clone() }.into());
                }
                model
                    .unconstrain(name, values, block)
                    .map_err(|err| ConfigError::InvalidInit {
                        name: name.clone(),
                        message: format!("{err:#}"),
                    })?;
                if !all_finite(block) {
                    return Err(ConfigError::NonFiniteInit { name: name.clone() }.into());
                }
                log::debug!("using provided initial values for `{name}`");
            }
            None if radius > 0. => {
                block
                    .iter_mut()
                    .for_each(|val| *val = rng.random_range(-radius..=radius));
                log::debug!("drawing `{name}` uniformly from [-{radius}, {radius}]");
            }
            None => block.fill(0.),
        }
    }

    init_writer.header(&unconstrained_names(&blocks))?;
    init_writer.row(&position)?;
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        optimizer::chain_rng,
        test_models::{NormalModel, ScaleModel},
        writer::BufferWriter,
    };
    use pretty_assertions::assert_eq;

    fn inits(values: Vec<(&str, Vec<f64>)>) -> HashMap<String, Vec<f64>> {
        values
            .into_iter()
            .map(|(name, vals)| (name.to_string(), vals))
            .collect()
    }

    #[test]
    fn zero_radius_gives_zeros() {
        let model = NormalModel::new(vec![1., 2., 3.]);
        let mut rng = chain_rng(1, 0);
        let mut writer = BufferWriter::new();
        let position = initialize(&model, &NoInits, &mut rng, 0., &mut writer).unwrap();
        assert_eq!(position, vec![0., 0., 0.]);
        assert_eq!(
            writer.header_names().unwrap(),
            &["x.1".to_string(), "x.2".to_string(), "x.3".to_string()]
        );
        assert_eq!(writer.rows(), vec![&[0., 0., 0.][..]]);
    }

    #[test]
    fn random_inits_stay_in_radius_and_repeat() {
        let model = NormalModel::new(vec![0.; 50]);
        let mut writer = BufferWriter::new();

        let mut rng = chain_rng(42, 3);
        let first = initialize(&model, &NoInits, &mut rng, 0.5, &mut writer).unwrap();
        assert!(first.iter().all(|x| x.abs() <= 0.5));
        assert!(first.iter().any(|&x| x != 0.));

        let mut rng = chain_rng(42, 3);
        let second = initialize(&model, &NoInits, &mut rng, 0.5, &mut BufferWriter::new()).unwrap();
        assert_eq!(first, second);

        let mut rng = chain_rng(42, 4);
        let other = initialize(&model, &NoInits, &mut rng, 0.5, &mut BufferWriter::new()).unwrap();
        assert!(first != other);
    }

    #[test]
    fn provided_values_are_unconstrained() {
        let model = ScaleModel::new(1.5);
        let mut rng = chain_rng(0, 0);
        let mut writer = BufferWriter::new();
        let inits = inits(vec![("sigma", vec![std::f64::consts::E])]);
        let position = initialize(&model, &inits, &mut rng, 2., &mut writer).unwrap();
        assert_eq!(position.len(), 2);
        approx::assert_abs_diff_eq!(position[1], 1., epsilon = 1e-12);
        assert!(position[0].abs() <= 2.);
        assert_eq!(
            writer.header_names().unwrap(),
            &["mu".to_string(), "sigma".to_string()]
        );
    }

    #[test]
    fn invalid_inits_fail_before_writing() {
        let model = ScaleModel::new(1.);
        let mut writer = BufferWriter::new();

        let bad = inits(vec![("sigma", vec![-1.])]);
        let err = initialize(&model, &bad, &mut chain_rng(0, 0), 2., &mut writer).unwrap_err();
        assert!(matches!(
            err,
            FitError::Config(ConfigError::InvalidInit { ref name, .. }) if name == "sigma"
        ));

        let bad = inits(vec![("mu", vec![f64::NAN])]);
        let err = initialize(&model, &bad, &mut chain_rng(0, 0), 2., &mut writer).unwrap_err();
        assert!(matches!(
            err,
            FitError::Config(ConfigError::NonFiniteInit { .. })
        ));

        let bad = inits(vec![("mu", vec![1., 2.])]);
        let err = initialize(&model, &bad, &mut chain_rng(0, 0), 2., &mut writer).unwrap_err();
        assert!(matches!(err, FitError::Config(ConfigError::InvalidInit { .. })));

        let err = initialize(&model, &NoInits, &mut chain_rng(0, 0), -1., &mut writer).unwrap_err();
        assert!(matches!(err, FitError::Config(ConfigError::InvalidRadius(_))));

        assert!(writer.records().is_empty());
    }

    #[test]
    fn inconsistent_blocks_are_rejected() {
        let mut model = NormalModel::new(vec![0.; 3]);
        model.blocks = vec![("x".to_string(), 2)];
        let err = initialize(&model, &NoInits, &mut chain_rng(0, 0), 0., &mut NullWriterCheck)
            .unwrap_err();
        assert!(matches!(
            err,
            FitError::Config(ConfigError::DimensionMismatch {
                expected: 3,
                found: 2
            })
        ));

        model.blocks = vec![("x".to_string(), 2), ("x".to_string(), 1)];
        let err = initialize(&model, &NoInits, &mut chain_rng(0, 0), 0., &mut NullWriterCheck)
            .unwrap_err();
        assert!(matches!(err, FitError::Config(ConfigError::DuplicateBlock(_))));
    }

    struct NullWriterCheck;

    impl Writer for NullWriterCheck {
        fn message(&mut self, _text: &str) -> anyhow::Result<()> {
            panic!("no output expected")
        }

        fn header(&mut self, _names: &[String]) -> anyhow::Result<()> {
            panic!("no output expected")
        }

        fn row(&mut self, _values: &[f64]) -> anyhow::Result<()> {
            panic!("no output expected")
        }
    }

    #[test]
    fn unknown_names_are_ignored() {
        let model = NormalModel::new(vec![0.; 2]);
        let inits = inits(vec![("y", vec![1.]), ("x", vec![0.5, -0.5])]);
        let position =
            initialize(&model, &inits, &mut chain_rng(0, 0), 2., &mut BufferWriter::new()).unwrap();
        assert_eq!(position, vec![0.5, -0.5]);
    }
}
