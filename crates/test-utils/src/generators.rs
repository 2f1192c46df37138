//! Predictable payloads for test records.

/// Values of the record with ordinal `record`: `record * 1000 + i`.
///
/// Every record gets a distinct, easily recognised payload, and the values
/// survive 16-bit simple packing exactly while `len` stays below 65536.
///
/// ```
/// use test_utils::record_values;
///
/// let values = record_values(2, 4);
/// assert_eq!(values, vec![2000.0, 2001.0, 2002.0, 2003.0]);
/// ```
pub fn record_values(record: usize, len: usize) -> Vec<f32> {
    (0..len).map(|i| (record * 1000 + i) as f32).collect()
}

/// Creates a test grid where each cell is `col * 1000 + row`, row-major.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}
