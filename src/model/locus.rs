use crate::{ClonescanError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Receptor locus resolved from gene calls. `Dj` marks incomplete IGH
/// rearrangements that carry no V call at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locus {
    #[serde(rename = "TCRAD")]
    Tcrad,
    #[serde(rename = "TCRB")]
    Tcrb,
    #[serde(rename = "TCRG")]
    Tcrg,
    #[serde(rename = "IGH")]
    Igh,
    #[serde(rename = "IGK")]
    Igk,
    #[serde(rename = "IGL")]
    Igl,
    #[serde(rename = "DJ")]
    Dj,
}

/// Aggregation group for summary counts; kappa and lambda light chains
/// accumulate together.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum LocusGroup {
    #[serde(rename = "TCRAD")]
    Tcrad,
    #[serde(rename = "TCRB")]
    Tcrb,
    #[serde(rename = "TCRG")]
    Tcrg,
    #[serde(rename = "IGH")]
    Igh,
    #[serde(rename = "IGKL")]
    Igkl,
    #[serde(rename = "DJ")]
    Dj,
}

impl Locus {
    pub fn group(&self) -> LocusGroup {
        match self {
            Locus::Tcrad => LocusGroup::Tcrad,
            Locus::Tcrb => LocusGroup::Tcrb,
            Locus::Tcrg => LocusGroup::Tcrg,
            Locus::Igh => LocusGroup::Igh,
            Locus::Igk | Locus::Igl => LocusGroup::Igkl,
            Locus::Dj => LocusGroup::Dj,
        }
    }

    /// Classify from resolved gene calls, falling back to the family-tie
    /// lists when every resolved call is empty. J wins over D wins over V
    /// because the J call is the most reliably present.
    pub fn from_genes(
        v: &str,
        d: &str,
        j: &str,
        v_ties: &str,
        d_ties: &str,
        j_ties: &str,
    ) -> Result<Locus> {
        let gene = [j, d, v, j_ties, d_ties, v_ties]
            .into_iter()
            .find(|g| !g.is_empty())
            .unwrap_or("");

        if gene.starts_with("TCRB") {
            Ok(Locus::Tcrb)
        } else if gene.starts_with("TCRG") {
            Ok(Locus::Tcrg)
        } else if gene.starts_with("TCRAD") || gene.starts_with("TCRA") || gene.starts_with("TCRD")
        {
            Ok(Locus::Tcrad)
        } else if gene.starts_with("IGH") {
            if v.is_empty() && v_ties.is_empty() {
                Ok(Locus::Dj)
            } else {
                Ok(Locus::Igh)
            }
        } else if gene.starts_with("IGK") {
            Ok(Locus::Igk)
        } else if gene.starts_with("IGL") {
            Ok(Locus::Igl)
        } else {
            Err(ClonescanError::Parse(format!("bad locus gene: {:?}", gene)))
        }
    }
}

impl fmt::Display for LocusGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LocusGroup::Tcrad => "TCRAD",
            LocusGroup::Tcrb => "TCRB",
            LocusGroup::Tcrg => "TCRG",
            LocusGroup::Igh => "IGH",
            LocusGroup::Igkl => "IGKL",
            LocusGroup::Dj => "DJ",
        };
        f.write_str(s)
    }
}

/// Reading-frame status of the rearrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameType {
    In,
    Out,
    Stop,
}

impl FromStr for FrameType {
    type Err = ClonescanError;

    fn from_str(s: &str) -> Result<FrameType> {
        match s.to_ascii_lowercase().as_str() {
            "in" => Ok(FrameType::In),
            "out" => Ok(FrameType::Out),
            "stop" => Ok(FrameType::Stop),
            other => Err(ClonescanError::Parse(format!("bad frame type: {:?}", other))),
        }
    }
}
