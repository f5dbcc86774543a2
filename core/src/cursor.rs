//! Lazy, cacheable row materializers over a driver cursor (§4.7).

use compact_str::CompactString;

use crate::error::Result;
use crate::value::Value;

/// One row as reported by the driver before any shaping is applied.
pub type RawRow = Vec<Value>;

/// A minimal cursor contract: pull the next raw row, or `None` at EOF, plus
/// the projected column names (post-`.` segment of the driver's
/// description, §4.7).
pub trait RowSource {
    fn column_names(&self) -> &[CompactString];
    fn next_row(&mut self) -> Result<Option<RawRow>>;
}

/// A per-row conversion, parameterized over the target shape (§4.7):
/// TUPLE/DICT/NAMED_TUPLE/CONSTRUCTOR all reduce to "given the raw values
/// and column names, produce a `T`"; MODEL additionally needs the
/// join-aware materializer, which only needs the raw values.
pub struct RowShape<T>(Box<dyn Fn(RawRow, &[CompactString]) -> Result<T>>);

impl<T> RowShape<T> {
    pub fn tuple() -> RowShape<RawRow> {
        RowShape(Box::new(|row, _cols| Ok(row)))
    }

    pub fn dict() -> RowShape<DictRow> {
        RowShape(Box::new(|row, cols| {
            Ok(DictRow {
                columns: cols.to_vec(),
                values: row,
            })
        }))
    }

    /// Same wire shape as `dict()`; NAMED_TUPLE differs only in how the
    /// caller subsequently accesses fields (by name vs. attribute), which
    /// is a consumer-side concern this crate doesn't prescribe.
    pub fn named_tuple() -> RowShape<DictRow> {
        Self::dict()
    }

    pub fn constructor(f: impl Fn(RawRow, &[CompactString]) -> Result<T> + 'static) -> Self {
        RowShape(Box::new(f))
    }

    /// The join-aware model materializer only needs raw values; column
    /// metadata was already consulted once at initialization (§4.7 step 1).
    pub fn model(f: impl Fn(RawRow) -> Result<T> + 'static) -> Self {
        RowShape(Box::new(move |row, _cols| f(row)))
    }
}

/// Lazily pulls from a [`RowSource`], caching materialized rows; supports
/// indexing/slicing through the cache and a single-pass `iterator()` that
/// bypasses it (§4.7).
pub struct CursorWrapper<S: RowSource, T> {
    source: S,
    shape: RowShape<T>,
    cache: Vec<T>,
    exhausted: bool,
}

impl<S: RowSource, T> CursorWrapper<S, T> {
    pub fn new(source: S, shape: RowShape<T>) -> Self {
        CursorWrapper {
            source,
            shape,
            cache: Vec::new(),
            exhausted: false,
        }
    }

    fn materialize(&mut self, raw: RawRow) -> Result<T> {
        (self.shape.0)(raw, self.source.column_names())
    }

    /// Materializes at least `n` more rows into the cache (or all remaining
    /// rows if `n` is `None`).
    pub fn fill_cache(&mut self, n: Option<usize>) -> Result<()> {
        loop {
            if self.exhausted {
                return Ok(());
            }
            if let Some(n) = n {
                if self.cache.len() >= n {
                    return Ok(());
                }
            }
            match self.source.next_row()? {
                Some(raw) => {
                    let row = self.materialize(raw)?;
                    self.cache.push(row);
                }
                None => {
                    self.exhausted = true;
                    return Ok(());
                }
            }
        }
    }

    pub fn get(&mut self, index: usize) -> Result<Option<&T>> {
        self.fill_cache(Some(index + 1))?;
        Ok(self.cache.get(index))
    }

    pub fn len_cached(&self) -> usize {
        self.cache.len()
    }

    /// Materializes every remaining row and returns the full cache.
    pub fn all(&mut self) -> Result<&[T]> {
        self.fill_cache(None)?;
        Ok(&self.cache)
    }

    /// Single-pass iteration that never populates the cache.
    pub fn iterator(mut self) -> impl Iterator<Item = Result<T>> {
        std::iter::from_fn(move || match self.source.next_row() {
            Ok(Some(raw)) => Some(self.materialize(raw)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        })
    }
}

/// Raw TUPLE/DICT/NAMED_TUPLE presentation, built directly from a
/// [`RowSource`] without going through [`CursorWrapper`]'s generic shaping
/// (those three shapes need no per-row conversion function, just the
/// column names).
pub struct DictRow {
    pub columns: Vec<CompactString>,
    pub values: Vec<Value>,
}

impl DictRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.as_str() == column)
            .and_then(|i| self.values.get(i))
    }
}

/// Strips everything up to and including the first `.` from a driver
/// column description, per §4.7's DICT/NAMED_TUPLE column naming rule.
pub fn strip_table_qualifier(name: &str) -> &str {
    match name.find('.') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_qualifier_before_first_dot() {
        assert_eq!(strip_table_qualifier("t1.name"), "name");
        assert_eq!(strip_table_qualifier("name"), "name");
    }

    #[test]
    fn strips_only_up_to_first_dot_with_multiple_dots() {
        assert_eq!(strip_table_qualifier("schema.t1.name"), "t1.name");
    }

    struct VecSource {
        columns: Vec<CompactString>,
        rows: std::vec::IntoIter<RawRow>,
    }

    impl RowSource for VecSource {
        fn column_names(&self) -> &[CompactString] {
            &self.columns
        }
        fn next_row(&mut self) -> Result<Option<RawRow>> {
            Ok(self.rows.next())
        }
    }

    #[test]
    fn fill_cache_stops_at_requested_count() {
        let source = VecSource {
            columns: vec!["id".into()],
            rows: vec![
                vec![Value::Integer(1)],
                vec![Value::Integer(2)],
                vec![Value::Integer(3)],
            ]
            .into_iter(),
        };
        let mut cursor = CursorWrapper::new(
            source,
            RowShape::constructor(|row, _cols| Ok(row[0].clone())),
        );
        cursor.fill_cache(Some(2)).unwrap();
        assert_eq!(cursor.len_cached(), 2);
        cursor.fill_cache(None).unwrap();
        assert_eq!(cursor.len_cached(), 3);
    }
}
