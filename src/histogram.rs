use crate::predicate::Op;

/// Equi-width histogram over a fixed integer domain, used for selectivity
/// estimates of scalar predicates.
pub struct IntHistogram {
    buckets: Vec<usize>,
    min: i32,
    max: i32,
    bucket_width: f64,
    ntuples: usize,
}

impl IntHistogram {
    pub fn new(bucket_count: usize, min: i32, max: i32) -> Self {
        assert!(bucket_count > 0);
        assert!(min <= max);
        let span = (max as i64 - min as i64 + 1) as f64;
        Self {
            buckets: vec![0; bucket_count],
            min,
            max,
            bucket_width: span / bucket_count as f64,
            ntuples: 0,
        }
    }

    fn bucket_index(&self, v: i32) -> usize {
        let offset = (v as i64 - self.min as i64) as f64;
        let index = (offset / self.bucket_width) as usize;
        index.min(self.buckets.len() - 1)
    }

    /// Left edge of the bucket, inclusive.
    fn bucket_left(&self, index: usize) -> f64 {
        self.min as f64 + index as f64 * self.bucket_width
    }

    /// Right edge of the bucket, exclusive.
    fn bucket_right(&self, index: usize) -> f64 {
        self.bucket_left(index) + self.bucket_width
    }

    pub fn add_value(&mut self, v: i32) {
        debug_assert!(v >= self.min && v <= self.max);
        let index = self.bucket_index(v);
        self.buckets[index] += 1;
        self.ntuples += 1;
    }

    /// Estimated fraction of the recorded values matching `v op value`.
    pub fn estimate_selectivity(&self, op: Op, v: i32) -> f64 {
        if self.ntuples == 0 {
            return 0.0;
        }

        match op {
            Op::Equals => self.selectivity_equals(v),
            Op::NotEquals => 1.0 - self.selectivity_equals(v),
            Op::GreaterThan => self.selectivity_greater(v),
            Op::GreaterThanOrEq => {
                self.selectivity_greater(v) + self.selectivity_equals(v)
            }
            Op::LessThan => {
                1.0 - self.selectivity_greater(v) - self.selectivity_equals(v)
            }
            Op::LessThanOrEq => 1.0 - self.selectivity_greater(v),
        }
        .max(0.0)
        .min(1.0)
    }

    fn selectivity_equals(&self, v: i32) -> f64 {
        if v < self.min || v > self.max {
            return 0.0;
        }
        let index = self.bucket_index(v);
        let height = self.buckets[index] as f64;
        (height / self.bucket_width) / self.ntuples as f64
    }

    fn selectivity_greater(&self, v: i32) -> f64 {
        if v < self.min {
            return 1.0;
        }
        if v >= self.max {
            return 0.0;
        }

        let index = self.bucket_index(v);
        let height = self.buckets[index] as f64;

        // fraction of the value's own bucket lying strictly to the right
        let partial = (self.bucket_right(index) - (v as f64 + 1.0))
            / self.bucket_width;
        let mut selectivity =
            (height / self.ntuples as f64) * partial.max(0.0);

        for i in index + 1..self.buckets.len() {
            selectivity += self.buckets[i] as f64 / self.ntuples as f64;
        }
        selectivity
    }

    /// Mean per-bucket fraction; a crude default for unparameterized
    /// predicates.
    pub fn avg_selectivity(&self) -> f64 {
        if self.ntuples == 0 {
            return 0.0;
        }
        let filled: f64 = self
            .buckets
            .iter()
            .map(|h| *h as f64 / self.ntuples as f64)
            .sum();
        filled / self.buckets.len() as f64
    }
}

/// Histogram over string values, backed by an `IntHistogram` of a
/// fixed-prefix integer mapping: the first four bytes interpreted base-128.
pub struct StringHistogram {
    inner: IntHistogram,
}

impl StringHistogram {
    pub fn new(bucket_count: usize) -> Self {
        Self {
            inner: IntHistogram::new(
                bucket_count,
                0,
                string_to_int("\u{7f}\u{7f}\u{7f}\u{7f}"),
            ),
        }
    }

    pub fn add_value(&mut self, s: &str) {
        self.inner.add_value(string_to_int(s));
    }

    pub fn estimate_selectivity(&self, op: Op, s: &str) -> f64 {
        self.inner.estimate_selectivity(op, string_to_int(s))
    }
}

fn string_to_int(s: &str) -> i32 {
    let bytes = s.as_bytes();
    let mut v: i32 = 0;
    for i in 0..4 {
        let b = bytes.get(i).copied().unwrap_or(0).min(0x7f) as i32;
        v = v * 128 + b;
    }
    v
}
