//! Derived-parameter maintenance for grazing-incidence optics.
//!
//! A mirror or grating whose grazing angle is being tuned also carries a
//! surface-normal and a tangential vector. The simulator does not keep them
//! consistent with the angle, so before every evaluation the optimizer
//! recomputes them from the driver dimension and pushes them to the optic.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{DEError, Result};

/// Which derived components are forced to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coupling {
    /// Both axes carry the computed components.
    #[default]
    Free,
    /// Deflection in the horizontal plane: Y components are zero.
    Horizontal,
    /// Deflection in the vertical plane: X components are zero.
    Vertical,
}

impl FromStr for Coupling {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" | "none" => Ok(Coupling::Free),
            "horizontal" | "h" => Ok(Coupling::Horizontal),
            "vertical" | "v" => Ok(Coupling::Vertical),
            _ => Err(format!("unknown coupling: {}", s)),
        }
    }
}

/// Binds one optimized dimension (a grazing angle in mrad) to an optic's
/// normal/tangential vector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverLink {
    /// Index of the grazing-angle dimension in the parameter vector.
    pub driver: usize,
    /// Name of the optic receiving the derived parameters.
    pub optic: String,
    /// Which axis is locked.
    #[serde(default)]
    pub coupling: Coupling,
}

/// The five scalars pushed to an optic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedParams {
    /// X component of the surface normal.
    pub normal_vector_x: f64,
    /// Y component of the surface normal.
    pub normal_vector_y: f64,
    /// Z component of the surface normal.
    pub normal_vector_z: f64,
    /// X component of the tangential vector.
    pub tangential_vector_x: f64,
    /// Y component of the tangential vector.
    pub tangential_vector_y: f64,
}

impl DerivedParams {
    /// Computes the vectors for a grazing angle given in milliradians.
    pub fn from_grazing_angle(angle_mrad: f64, coupling: Coupling) -> Self {
        let theta = angle_mrad / 1000.0;
        let nv = (1.0 - theta.sin().powi(2)).max(0.0).sqrt();
        let tv = (1.0 - theta.cos().powi(2)).max(0.0).sqrt();

        let mut p = Self {
            normal_vector_x: nv,
            normal_vector_y: nv,
            normal_vector_z: -tv,
            tangential_vector_x: tv,
            tangential_vector_y: tv,
        };
        match coupling {
            Coupling::Free => {}
            Coupling::Horizontal => {
                p.normal_vector_y = 0.0;
                p.tangential_vector_y = 0.0;
            }
            Coupling::Vertical => {
                p.normal_vector_x = 0.0;
                p.tangential_vector_x = 0.0;
            }
        }
        p
    }

    /// Parameter names as the simulator spells them, paired with values.
    pub fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("normalVectorX", self.normal_vector_x),
            ("normalVectorY", self.normal_vector_y),
            ("normalVectorZ", self.normal_vector_z),
            ("tangentialVectorX", self.tangential_vector_x),
            ("tangentialVectorY", self.tangential_vector_y),
        ]
    }
}

impl fmt::Display for DerivedParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries()
            .iter()
            .map(|(k, v)| format!("{}={:.6}", k, v))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

impl DriverLink {
    /// Creates a link with the given coupling.
    pub fn new(driver: usize, optic: impl Into<String>, coupling: Coupling) -> Self {
        Self {
            driver,
            optic: optic.into(),
            coupling,
        }
    }

    /// Derived parameters for the candidate `x`.
    pub fn derive(&self, x: &Array1<f64>) -> DerivedParams {
        DerivedParams::from_grazing_angle(x[self.driver], self.coupling)
    }

    pub(crate) fn validate(links: &[DriverLink], dims: usize) -> Result<()> {
        for link in links {
            if link.driver >= dims {
                return Err(DEError::DriverIndexOutOfRange {
                    optic: link.optic.clone(),
                    index: link.driver,
                    dims,
                });
            }
        }
        Ok(())
    }
}
