//! Input vectors and data points for single matches

use super::families::{self, Family, FamilyContext, SideFilter};
use super::scheme::{FeatureMapping, InterpretationScheme};
use super::window;
use crate::data::{Catalog, DataPoint};
use crate::{FeatureConfig, MatchRecord, Side};

/// Builds feature vectors from causal history
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor<'a> {
    ctx: FamilyContext<'a>,
}

impl<'a> FeatureExtractor<'a> {
    pub fn new(catalog: &'a Catalog, expiry_days: i64, recent_opponents: usize) -> Self {
        FeatureExtractor {
            ctx: FamilyContext {
                catalog,
                expiry_days,
                recent_opponents,
            },
        }
    }

    pub fn from_config(catalog: &'a Catalog, config: &FeatureConfig) -> Self {
        Self::new(catalog, config.expiry_days, config.recent_opponents)
    }

    /// Input vector for `target`, home values before away values, in scheme order.
    ///
    /// `history` must be the causal history of `target`; matches at or after its
    /// kick-off are ignored regardless.
    pub fn build_inputs(
        &self,
        history: &[MatchRecord],
        target: &MatchRecord,
        scheme: &InterpretationScheme,
    ) -> Vec<f64> {
        let mut inputs = Vec::with_capacity(scheme.input_len());
        for (family, term) in scheme.active_terms() {
            inputs.extend(self.extract(family, history, target, term, &scheme.features));
        }
        inputs
    }

    /// Values for one family and one window size
    pub fn extract<M: FeatureMapping + ?Sized>(
        &self,
        family: Family,
        history: &[MatchRecord],
        target: &MatchRecord,
        term: usize,
        mapping: &M,
    ) -> Vec<f64> {
        let mut values = Vec::with_capacity(family.arity(mapping));

        match family {
            Family::OpponentQuality => {
                let measures = mapping.result_measures();
                for side in Side::BOTH {
                    let results = families::opponent_results(&self.ctx, history, target, side);
                    for measure in &measures {
                        values.push(window::aggregate_results(
                            &results,
                            term,
                            measure.select,
                            |k| measure.max_for(k),
                        ));
                    }
                }
            }
            _ => {
                let measures = if family == Family::TeamWin {
                    mapping.win_measures()
                } else {
                    mapping.score_measures()
                };
                for side in Side::BOTH {
                    let filter = SideFilter::new(&self.ctx, family, history, target, side);
                    let team = filter.team();
                    for measure in &measures {
                        values.push(window::aggregate(
                            history,
                            |m| filter.accepts(m),
                            term,
                            |m| (measure.select)(m, team),
                            |k| measure.max_for(k),
                        ));
                    }
                }
            }
        }

        values
    }

    /// (inputs, outputs, reference) for one match
    pub fn build_data_point(
        &self,
        history: &[MatchRecord],
        target: &MatchRecord,
        scheme: &InterpretationScheme,
    ) -> DataPoint {
        DataPoint {
            inputs: self.build_inputs(history, target, scheme),
            outputs: scheme.features.outputs(target),
            reference: target.reference(),
        }
    }
}
