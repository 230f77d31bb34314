use snafu::{ensure, ResultExt, Snafu};
use std::str::FromStr;

use crate::volume::{Dimension, Index};

#[derive(Debug, Snafu)]
pub enum ParseVectorError {
    #[snafu(display("invalid vector component '{}' in '{}'", component, input))]
    InvalidComponent { input: String, component: String },

    #[snafu(display("expected {} components in '{}', found {}", expected, input, actual))]
    ComponentCount {
        input: String,
        expected: usize,
        actual: usize,
    },

    #[snafu(display("invalid radius '{}'", input))]
    InvalidRadius {
        input: String,
        #[snafu(source(from(std::num::ParseIntError, Box::new)))]
        source: Box<std::num::ParseIntError>,
    },
}

/// Split a vector argument. Components may be separated by `x` (as in `128x96x40`) or commas.
pub fn parse_vector<T: FromStr>(input: &str) -> Result<Vec<T>, ParseVectorError> {
    input
        .split(|c| c == 'x' || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<T>().map_err(|_| ParseVectorError::InvalidComponent {
                input: input.to_string(),
                component: s.to_string(),
            })
        })
        .collect()
}

/// Parse a vector with at least as many components as the dimension requires.
/// Extra components are ignored and missing trailing z components are zero-filled
/// for 2D inputs.
pub fn parse_fixed<T: FromStr + Copy + Default>(
    input: &str,
    dimension: Dimension,
) -> Result<[T; 3], ParseVectorError> {
    let values = parse_vector::<T>(input)?;
    ensure!(
        values.len() >= dimension.axes(),
        ComponentCountSnafu {
            input,
            expected: dimension.axes(),
            actual: values.len(),
        }
    );
    let mut result = [T::default(); 3];
    for d in 0..dimension.axes() {
        result[d] = values[d];
    }
    Ok(result)
}

pub fn parse_index(input: &str, dimension: Dimension) -> Result<Index, ParseVectorError> {
    parse_fixed::<i64>(input, dimension)
}

/// Parse a radius given either as a single value applied to every axis or per axis.
pub fn parse_radius(input: &str, dimension: Dimension) -> Result<[usize; 3], ParseVectorError> {
    if !input.contains(['x', ',']) {
        let radius = input
            .trim()
            .parse::<usize>()
            .context(InvalidRadiusSnafu { input })?;
        let mut result = [0; 3];
        result[..dimension.axes()].fill(radius);
        return Ok(result);
    }
    parse_fixed::<usize>(input, dimension)
}
