//! Property-based generators for schemas and subarrays.
//!
//! These strategies are used in `proptest`-based tests to construct
//! randomized dense writes for testing the tiler's geometry and
//! materialization invariants.
//!
//! The main entry point is [`gen_dense_write(max_dims)`], which
//! generates an `i32`-domain schema of bounded dimensionality and
//! extent, a subarray contained in its domain, and a subarray layout.
//! The domains are kept small enough that tests can enumerate every
//! cell of every produced tile.
//!
//! This module is only included in test builds (`#[cfg(test)]`).

use proptest::prelude::*;

use crate::datatype::Datatype;
use crate::layout::Layout;
use crate::schema::ArraySchema;
use crate::schema::Attribute;
use crate::schema::Dimension;

pub fn gen_layout() -> impl Strategy<Value = Layout> {
    prop_oneof![Just(Layout::RowMajor), Just(Layout::ColumnMajor)]
}

/// One dimension's domain low edge, domain width, and tile extent,
/// plus a subarray range contained in the domain.
fn gen_dim_and_range() -> impl Strategy<Value = ((i32, i32, i32), [i32; 2])> {
    (-8i32..=8, 1i32..=12, 1i32..=5).prop_flat_map(|(lo, width, ext)| {
        (0..width).prop_flat_map(move |off| {
            (1..=width - off)
                .prop_map(move |len| ((lo, width, ext), [lo + off, lo + off + len - 1]))
        })
    })
}

/// Generates a complete dense-write setup: a schema with up to
/// `max_dims` dimensions and a single `int32` attribute `"a"`, an
/// in-domain subarray range per dimension, and the subarray's
/// traversal layout. Tile order, cell order, and subarray layout vary
/// independently, so all order combinations are exercised.
pub fn gen_dense_write(
    max_dims: usize,
) -> BoxedStrategy<(ArraySchema<i32>, Vec<[i32; 2]>, Layout)> {
    (1..=max_dims)
        .prop_flat_map(|dim_num| {
            (
                proptest::collection::vec(gen_dim_and_range(), dim_num),
                gen_layout(),
                gen_layout(),
                gen_layout(),
            )
        })
        .prop_map(|(dims, tile_order, cell_order, sub_layout)| {
            let dimensions = dims
                .iter()
                .enumerate()
                .map(|(d, ((lo, width, ext), _))| {
                    Dimension::new(format!("d{}", d), [*lo, lo + width - 1], *ext).unwrap()
                })
                .collect();
            let ranges = dims.iter().map(|(_, range)| *range).collect();
            let schema = ArraySchema::new(
                dimensions,
                vec![Attribute::new("a", Datatype::Int32)],
                tile_order,
                cell_order,
            )
            .unwrap();
            (schema, ranges, sub_layout)
        })
        .boxed()
}

mod tests {
    use proptest::strategy::ValueTree;
    use proptest::test_runner::Config;
    use proptest::test_runner::TestRunner;

    use super::*;

    #[test]
    fn sample_many() {
        let mut runner = TestRunner::new(Config::default());
        for _ in 0..64 {
            let strat = gen_dense_write(3);
            let (schema, ranges, _) = strat.new_tree(&mut runner).unwrap().current();
            assert_eq!(schema.dim_num(), ranges.len());
            for (dim, range) in schema.dimensions().iter().zip(&ranges) {
                assert!(dim.domain()[0] <= range[0]);
                assert!(range[0] <= range[1]);
                assert!(range[1] <= dim.domain()[1]);
            }
        }
    }
}
