//! Labeled summary collector.
//!
//! The `prometheus` crate ships counters, gauges and histograms but no
//! summary type. This collector keeps a sample count and sum per label
//! combination and is exposed as a `summary` family without quantiles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use prometheus::core::{Collector, Desc};
use prometheus::proto::{LabelPair, Metric, MetricFamily, MetricType, Summary};

#[derive(Default)]
struct SummaryCore {
    count: AtomicU64,
    // f64 stored as raw bits
    sum: AtomicU64,
}

impl SummaryCore {
    fn observe(&self, value: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        let mut current = self.sum.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match self
                .sum
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }
}

/// A single labeled series of a [`SummaryVec`].
#[derive(Clone)]
pub struct SummarySeries {
    core: Arc<SummaryCore>,
}

impl SummarySeries {
    /// Adds one sample.
    pub fn observe(&self, value: f64) {
        self.core.observe(value);
    }

    pub fn sample_count(&self) -> u64 {
        self.core.count.load(Ordering::Relaxed)
    }

    pub fn sample_sum(&self) -> f64 {
        f64::from_bits(self.core.sum.load(Ordering::Relaxed))
    }
}

/// A summary partitioned by label values.
#[derive(Clone)]
pub struct SummaryVec {
    desc: Desc,
    children: Arc<RwLock<HashMap<Vec<String>, Arc<SummaryCore>>>>,
}

impl SummaryVec {
    /// Creates a summary family with the given variable label names.
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> prometheus::Result<Self> {
        let desc = Desc::new(
            name.to_string(),
            help.to_string(),
            label_names.iter().map(|l| l.to_string()).collect(),
            HashMap::new(),
        )?;
        Ok(SummaryVec {
            desc,
            children: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Returns the series for `values`, creating it on first use.
    ///
    /// Fails with `InconsistentCardinality` when the number of values does not
    /// match the declared label names.
    pub fn get_metric_with_label_values(&self, values: &[&str]) -> prometheus::Result<SummarySeries> {
        let expect = self.desc.variable_labels.len();
        if values.len() != expect {
            return Err(prometheus::Error::InconsistentCardinality {
                expect,
                got: values.len(),
            });
        }
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();

        if let Some(core) = self.read_children().get(&key) {
            return Ok(SummarySeries { core: core.clone() });
        }

        let mut children = match self.children.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let core = children.entry(key).or_default().clone();
        Ok(SummarySeries { core })
    }

    fn read_children(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Vec<String>, Arc<SummaryCore>>> {
        match self.children.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn label_pairs(&self, values: &[String]) -> Vec<LabelPair> {
        let mut pairs: Vec<LabelPair> = self
            .desc
            .variable_labels
            .iter()
            .zip(values)
            .map(|(name, value)| {
                let mut pair = LabelPair::default();
                pair.set_name(name.clone());
                pair.set_value(value.clone());
                pair
            })
            .collect();
        pairs.sort_by(|a, b| a.get_name().cmp(b.get_name()));
        pairs
    }
}

impl Collector for SummaryVec {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut family = MetricFamily::default();
        family.set_name(self.desc.fq_name.clone());
        family.set_help(self.desc.help.clone());
        family.set_field_type(MetricType::SUMMARY);

        let children = self.read_children();
        let mut series: Vec<_> = children.iter().collect();
        series.sort_by(|a, b| a.0.cmp(b.0));

        for (values, core) in series {
            let mut summary = Summary::default();
            summary.set_sample_count(core.count.load(Ordering::Relaxed));
            summary.set_sample_sum(f64::from_bits(core.sum.load(Ordering::Relaxed)));

            let mut metric = Metric::default();
            for pair in self.label_pairs(values) {
                metric.mut_label().push(pair);
            }
            metric.set_summary(summary);
            family.mut_metric().push(metric);
        }

        vec![family]
    }
}
