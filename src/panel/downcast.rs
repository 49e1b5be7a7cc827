use arrow::array::{
    ArrayRef, Float32Builder, Float64Builder, Int16Builder, Int32Builder, Int64Builder,
    Int8Builder, StringBuilder,
};
use std::sync::Arc;

/// A typed column built from raw cells, plus how many non-missing cells
/// failed to convert and were coerced to null.
pub struct DowncastColumn {
    pub array: ArrayRef,
    pub coerced: u64,
}

/// Build the narrowest safe numeric array for a column. All-integral values
/// get the smallest nullable integer width that covers their range; anything
/// fractional gets Float32 when every value survives the round trip, Float64
/// otherwise. Cells that fail to parse become null and are counted — they
/// must stay distinguishable from zero.
pub fn numeric_column(values: &[Option<&str>]) -> DowncastColumn {
    let mut coerced = 0u64;
    let parsed: Vec<Option<f64>> = values
        .iter()
        .map(|v| match v {
            Some(s) => match s.parse::<f64>() {
                Ok(n) if n.is_finite() => Some(n),
                _ => {
                    coerced += 1;
                    None
                }
            },
            None => None,
        })
        .collect();

    let present: Vec<f64> = parsed.iter().flatten().copied().collect();
    if present.is_empty() {
        // no observed values; default integer width
        let mut b = Int32Builder::with_capacity(parsed.len());
        for _ in &parsed {
            b.append_null();
        }
        return DowncastColumn {
            array: Arc::new(b.finish()),
            coerced,
        };
    }

    let integral = present
        .iter()
        .all(|v| v.fract() == 0.0 && v.abs() < (1i64 << 53) as f64);

    let array: ArrayRef = if integral {
        let min = present.iter().cloned().fold(f64::INFINITY, f64::min) as i64;
        let max = present.iter().cloned().fold(f64::NEG_INFINITY, f64::max) as i64;
        if min >= i8::MIN as i64 && max <= i8::MAX as i64 {
            let mut b = Int8Builder::with_capacity(parsed.len());
            for v in &parsed {
                b.append_option(v.map(|x| x as i8));
            }
            Arc::new(b.finish())
        } else if min >= i16::MIN as i64 && max <= i16::MAX as i64 {
            let mut b = Int16Builder::with_capacity(parsed.len());
            for v in &parsed {
                b.append_option(v.map(|x| x as i16));
            }
            Arc::new(b.finish())
        } else if min >= i32::MIN as i64 && max <= i32::MAX as i64 {
            let mut b = Int32Builder::with_capacity(parsed.len());
            for v in &parsed {
                b.append_option(v.map(|x| x as i32));
            }
            Arc::new(b.finish())
        } else {
            let mut b = Int64Builder::with_capacity(parsed.len());
            for v in &parsed {
                b.append_option(v.map(|x| x as i64));
            }
            Arc::new(b.finish())
        }
    } else if present.iter().all(|v| (*v as f32) as f64 == *v) {
        let mut b = Float32Builder::with_capacity(parsed.len());
        for v in &parsed {
            b.append_option(v.map(|x| x as f32));
        }
        Arc::new(b.finish())
    } else {
        let mut b = Float64Builder::with_capacity(parsed.len());
        for v in &parsed {
            b.append_option(*v);
        }
        Arc::new(b.finish())
    };

    DowncastColumn { array, coerced }
}

/// Build a nullable Utf8 array; Parquet dictionary encoding takes care of
/// categorical compression at write time.
pub fn string_column(values: &[Option<&str>]) -> ArrayRef {
    let mut b = StringBuilder::new();
    for v in values {
        b.append_option(*v);
    }
    Arc::new(b.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Float32Array, Float64Array, Int16Array, Int32Array, Int8Array};
    use arrow::datatypes::DataType;

    #[test]
    fn small_integers_get_int8() {
        let col = numeric_column(&[Some("1"), Some("-5"), None, Some("127")]);
        assert_eq!(col.array.data_type(), &DataType::Int8);
        assert_eq!(col.coerced, 0);
        let arr = col.array.as_any().downcast_ref::<Int8Array>().unwrap();
        assert_eq!(arr.value(0), 1);
        assert!(arr.is_null(2));
    }

    #[test]
    fn range_drives_width_selection() {
        let col = numeric_column(&[Some("1000"), Some("-2000")]);
        assert_eq!(col.array.data_type(), &DataType::Int16);
        let _ = col.array.as_any().downcast_ref::<Int16Array>().unwrap();

        let col = numeric_column(&[Some("100000")]);
        assert_eq!(col.array.data_type(), &DataType::Int32);

        let col = numeric_column(&[Some("5000000000")]);
        assert_eq!(col.array.data_type(), &DataType::Int64);
    }

    #[test]
    fn null_stays_distinct_from_zero() {
        let col = numeric_column(&[Some("0"), None]);
        let arr = col.array.as_any().downcast_ref::<Int8Array>().unwrap();
        assert_eq!(arr.value(0), 0);
        assert!(!arr.is_null(0));
        assert!(arr.is_null(1));
    }

    #[test]
    fn fractional_values_become_float() {
        let col = numeric_column(&[Some("1.5"), Some("2.25")]);
        assert_eq!(col.array.data_type(), &DataType::Float32);
        let arr = col.array.as_any().downcast_ref::<Float32Array>().unwrap();
        assert_eq!(arr.value(0), 1.5);

        // 0.1 does not round-trip through f32
        let col = numeric_column(&[Some("0.1")]);
        assert_eq!(col.array.data_type(), &DataType::Float64);
        let arr = col.array.as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(arr.value(0), 0.1);
    }

    #[test]
    fn unparseable_cells_coerce_to_null_and_are_counted() {
        let col = numeric_column(&[Some("12"), Some("garbage"), Some("7")]);
        assert_eq!(col.coerced, 1);
        let arr = col.array.as_any().downcast_ref::<Int8Array>().unwrap();
        assert!(arr.is_null(1));
        assert_eq!(arr.value(2), 7);
    }

    #[test]
    fn all_missing_column_defaults_to_int32_nulls() {
        let col = numeric_column(&[None, None]);
        assert_eq!(col.array.data_type(), &DataType::Int32);
        let arr = col.array.as_any().downcast_ref::<Int32Array>().unwrap();
        assert_eq!(arr.null_count(), 2);
    }

    #[test]
    fn string_column_preserves_missing() {
        let arr = string_column(&[Some("abc"), None]);
        assert_eq!(arr.data_type(), &DataType::Utf8);
        assert_eq!(arr.null_count(), 1);
    }
}
