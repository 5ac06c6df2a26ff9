use crate::value::Datum;

/// Summary statistics of a numeric field over a set of records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Summarize the numeric values of `field`; `None` when there are none.
///
/// Dates are summarized as epoch milliseconds.
pub fn summarize(field: &str, rows: &[&Datum]) -> Option<Summary> {
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|d| d.get(field)?.as_f64())
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some(Summary {
        count: values.len(),
        min,
        max,
        mean,
    })
}

/// Quartile of `value` among `values`, ranked from largest: 0 is the top
/// quartile and 3 the bottom. `None` with fewer than two values.
///
/// The rank is spread over the whole range, so the smallest of any set is
/// always in the bottom quartile.
pub fn quartile(value: usize, values: &[usize]) -> Option<usize> {
    if values.len() < 2 {
        return None;
    }
    let larger = values.iter().filter(|&&v| v > value).count();
    Some((larger * 4 / (values.len() - 1)).min(3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_summarize() {
        let rows: Vec<Datum> = [1.0, 4.0, 7.0]
            .iter()
            .map(|v| Datum::from([("y".to_string(), Value::from(*v))]))
            .collect();
        let refs: Vec<&Datum> = rows.iter().collect();
        let s = summarize("y", &refs).unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 7.0);
        assert_eq!(s.mean, 4.0);
        assert!(summarize("z", &refs).is_none());
    }

    #[test]
    fn test_quartile() {
        let sizes = [10, 8, 5, 1];
        assert_eq!(quartile(10, &sizes), Some(0));
        assert_eq!(quartile(8, &sizes), Some(1));
        assert_eq!(quartile(5, &sizes), Some(2));
        assert_eq!(quartile(1, &sizes), Some(3));
        assert_eq!(quartile(1, &[2, 1]), Some(3));
        assert_eq!(quartile(3, &[3]), None);
    }
}
