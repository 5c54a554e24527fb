//! Schema-tolerant streaming parser for repertoire TSV files.
//!
//! Files open with an optional block of `#name=value` metadata lines, then
//! exactly one header row, then data rows. Two historical header
//! generations are recognized (the "v2" camel-case names and the "v3"
//! snake-case names); unknown columns are ignored and a record field whose
//! column is absent stays at its zero/empty value. A malformed numeric or
//! enumerated field aborts the whole stream; bad rows are never skipped
//! silently.

use crate::model::{FrameType, Locus, Rearrangement};
use crate::{ClonescanError, Result};
use std::io::{BufRead, BufReader, Read};

/// DNA mass per diploid cell, used to estimate input cells from a PCR
/// template mass when the file reports no explicit cell count.
const PICOGRAMS_PER_CELL: f64 = 6.5;

/// Template masses below this (in ng) are too noisy to estimate from.
const MIN_TEMPLATE_MASS_NG: f64 = 12.5;

/// Observer invoked with every raw line (metadata, header, and data) before
/// parsing; the ingestion path uses it to mirror exact bytes to storage.
pub type LinePeeker<'p> = Box<dyn FnMut(&str) -> std::io::Result<()> + Send + 'p>;

#[derive(Debug, Default, Clone)]
struct ColumnMap {
    rearrangement: Option<usize>,
    amino_acid: Option<usize>,
    frame_type: Option<usize>,
    count: Option<usize>,
    v_resolved: Option<usize>,
    d_resolved: Option<usize>,
    j_resolved: Option<usize>,
    cdr3_length: Option<usize>,
    v_index: Option<usize>,
    d_index: Option<usize>,
    j_index: Option<usize>,
    n1_index: Option<usize>,
    n2_index: Option<usize>,
    v_shm_indices: Option<usize>,
    v_ties: Option<usize>,
    d_ties: Option<usize>,
    j_ties: Option<usize>,
    cells: Option<usize>,
    cells_estimate: Option<usize>,
    input_template_estimate: Option<usize>,
    sequence_tags: Option<usize>,
    clone_probability: Option<usize>,
    log_clone_probability: Option<usize>,
}

impl ColumnMap {
    fn set(&mut self, header: &str, idx: usize) {
        let slot = match header {
            // v2 generation
            "nucleotide" => &mut self.rearrangement,
            "aminoacid" => &mut self.amino_acid,
            "sequencestatus" => &mut self.frame_type,
            "count (templates/reads)" => &mut self.count,
            "vmaxresolved" => &mut self.v_resolved,
            "dmaxresolved" => &mut self.d_resolved,
            "jmaxresolved" => &mut self.j_resolved,
            "cdr3length" => &mut self.cdr3_length,
            "vindex" => &mut self.v_index,
            "dindex" => &mut self.d_index,
            "jindex" => &mut self.j_index,
            "n1index" => &mut self.n1_index,
            "n2index" => &mut self.n2_index,
            "valignsubstitutionindexes" => &mut self.v_shm_indices,
            "vfamilyties" => &mut self.v_ties,
            "dfamilyties" => &mut self.d_ties,
            "jfamilyties" => &mut self.j_ties,
            "sequencetags" => &mut self.sequence_tags,
            "cloneprobability" => &mut self.clone_probability,
            "logcloneprobability" => &mut self.log_clone_probability,
            "inputtemplateestimate" => &mut self.input_template_estimate,

            // v3 generation
            "rearrangement" => &mut self.rearrangement,
            "amino_acid" => &mut self.amino_acid,
            "frame_type" => &mut self.frame_type,
            "templates" => &mut self.count,
            "v_resolved" => &mut self.v_resolved,
            "d_resolved" => &mut self.d_resolved,
            "j_resolved" => &mut self.j_resolved,
            "cdr3_length" => &mut self.cdr3_length,
            "v_index" => &mut self.v_index,
            "d_index" => &mut self.d_index,
            "j_index" => &mut self.j_index,
            "n1_index" => &mut self.n1_index,
            "n2_index" => &mut self.n2_index,
            "v_shm_indexes" => &mut self.v_shm_indices,
            "v_family_ties" => &mut self.v_ties,
            "d_family_ties" => &mut self.d_ties,
            "j_family_ties" => &mut self.j_ties,
            "sample_cells" => &mut self.cells,
            "sample_cells_mass_estimate" => &mut self.cells_estimate,
            "sequence_tags" => &mut self.sequence_tags,

            _ => return,
        };
        *slot = Some(idx);
    }
}

pub struct Reader<'p, R: Read> {
    buf: BufReader<R>,
    start_row_index: usize,
    peeker: Option<LinePeeker<'p>>,

    columns: Option<ColumnMap>,
    next_row_index: usize,
    cell_count: Option<u64>,
    sample_milliliters: Option<f64>,
}

impl<'p, R: Read> Reader<'p, R> {
    pub fn new(input: R, start_row_index: usize) -> Self {
        Self::with_peeker_opt(input, start_row_index, None)
    }

    pub fn with_peeker(input: R, start_row_index: usize, peeker: LinePeeker<'p>) -> Self {
        Self::with_peeker_opt(input, start_row_index, Some(peeker))
    }

    fn with_peeker_opt(input: R, start_row_index: usize, peeker: Option<LinePeeker<'p>>) -> Self {
        Reader {
            buf: BufReader::new(input),
            start_row_index,
            peeker,
            columns: None,
            next_row_index: 0,
            cell_count: None,
            sample_milliliters: None,
        }
    }

    /// Index of the next unread data row (for pagination).
    pub fn next_row_index(&self) -> usize {
        self.next_row_index
    }

    /// Cell count found in metadata or the first data row, if any.
    pub fn discovered_cell_count(&self) -> Option<u64> {
        self.cell_count
    }

    /// Sample volume (ml) found in metadata, if any.
    pub fn discovered_milliliters(&self) -> Option<f64> {
        self.sample_milliliters
    }

    pub fn read_next(&mut self) -> Result<Option<Rearrangement>> {
        if self.columns.is_none() {
            self.initialize()?;
        }

        loop {
            let Some(line) = self.read_line()? else {
                return Ok(None);
            };

            if line.trim().is_empty() {
                continue;
            }

            self.next_row_index += 1;
            return self.parse_row(&line).map(Some);
        }
    }

    pub fn read_batch(&mut self, max_count: usize) -> Result<Vec<Rearrangement>> {
        let mut batch = Vec::new();
        while batch.len() < max_count {
            match self.read_next()? {
                Some(r) => batch.push(r),
                None => break,
            }
        }
        Ok(batch)
    }

    fn initialize(&mut self) -> Result<()> {
        self.setup_headers()?;

        self.next_row_index = 0;
        while self.next_row_index < self.start_row_index {
            if self.read_line()?.is_none() {
                break;
            }
            self.next_row_index += 1;
        }

        Ok(())
    }

    fn setup_headers(&mut self) -> Result<()> {
        while let Some(line) = self.read_line()? {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                continue;
            }

            if let Some(meta) = trimmed.strip_prefix('#') {
                self.absorb_metadata(meta)?;
                continue;
            }

            // first real line is the column header
            let mut columns = ColumnMap::default();
            for (i, header) in trimmed.split('\t').enumerate() {
                columns.set(&header.trim().to_ascii_lowercase(), i);
            }
            self.columns = Some(columns);
            return Ok(());
        }

        Err(ClonescanError::Parse("no header row found".to_string()))
    }

    fn absorb_metadata(&mut self, meta: &str) -> Result<()> {
        let Some((name, value)) = meta.split_once('=') else {
            return Ok(()); // free-form comment
        };

        let name = name.trim();
        let value = value.trim();
        if value.is_empty() {
            return Ok(());
        }

        match name {
            "estTotalNucleatedCells" => {
                let cells = parse_f64(value, "estTotalNucleatedCells")?;
                self.cell_count = Some(cells as u64);
            }
            "sampleMilliliters" => {
                self.sample_milliliters = Some(parse_f64(value, "sampleMilliliters")?);
            }
            "productionPCRAmountofTemplate" if self.cell_count.is_none() => {
                let mass_ng = parse_f64(value, "productionPCRAmountofTemplate")?;
                if mass_ng >= MIN_TEMPLATE_MASS_NG {
                    self.cell_count = Some((mass_ng * 1000.0 / PICOGRAMS_PER_CELL) as u64);
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn parse_row(&mut self, line: &str) -> Result<Rearrangement> {
        let fields: Vec<&str> = line.split('\t').collect();
        let columns = self.columns.clone().unwrap_or_default();
        let row = self.next_row_index;

        let text = |slot: Option<usize>| -> &str {
            slot.and_then(|i| fields.get(i)).map(|s| s.trim()).unwrap_or("")
        };

        let mut r = Rearrangement {
            rearrangement: text(columns.rearrangement).to_string(),
            amino_acid: text(columns.amino_acid).to_string(),
            v_resolved: text(columns.v_resolved).to_string(),
            d_resolved: text(columns.d_resolved).to_string(),
            j_resolved: text(columns.j_resolved).to_string(),
            v_ties: text(columns.v_ties).to_string(),
            d_ties: text(columns.d_ties).to_string(),
            j_ties: text(columns.j_ties).to_string(),
            ..Rearrangement::default()
        };

        r.frame_type = text(columns.frame_type)
            .parse::<FrameType>()
            .map_err(|e| at_row(e, row))?;

        r.count = parse_u64_or(text(columns.count), 0).map_err(|e| at_row(e, row))?;

        // sequencer runs sometimes re-estimate template counts after the
        // fact; when the estimate column is present it wins
        let ite = text(columns.input_template_estimate);
        if !ite.is_empty() {
            r.count = parse_u64_or(ite, 0).map_err(|e| at_row(e, row))?;
        }

        r.cdr3_length = parse_i32_or(text(columns.cdr3_length), -1).map_err(|e| at_row(e, row))?;
        r.v_index = parse_i32_or(text(columns.v_index), -1).map_err(|e| at_row(e, row))?;
        r.d_index = parse_i32_or(text(columns.d_index), -1).map_err(|e| at_row(e, row))?;
        r.j_index = parse_i32_or(text(columns.j_index), -1).map_err(|e| at_row(e, row))?;
        r.n1_index = parse_i32_or(text(columns.n1_index), -1).map_err(|e| at_row(e, row))?;
        r.n2_index = parse_i32_or(text(columns.n2_index), -1).map_err(|e| at_row(e, row))?;

        let shm = text(columns.v_shm_indices);
        if !shm.is_empty() {
            let mut indices = Vec::new();
            for part in shm.split(',') {
                indices.push(parse_i32_or(part.trim(), -1).map_err(|e| at_row(e, row))?);
            }
            r.v_shm_indices = Some(indices);
        }

        r.dx = text(columns.sequence_tags).to_ascii_lowercase().contains("dx");

        let log_prob = text(columns.log_clone_probability);
        let prob = text(columns.clone_probability);
        if !log_prob.is_empty() {
            r.probability = parse_f64(log_prob, "logCloneProbability").map_err(|e| at_row(e, row))?;
        } else if !prob.is_empty() {
            r.probability = parse_f64(prob, "cloneProbability")
                .map_err(|e| at_row(e, row))?
                .log10();
        }

        r.locus = Locus::from_genes(
            &r.v_resolved,
            &r.d_resolved,
            &r.j_resolved,
            &r.v_ties,
            &r.d_ties,
            &r.j_ties,
        )
        .map_err(|e| at_row(e, row))?;

        r.compute_cdr3();

        // first data row can carry a per-sample cell count
        if self.cell_count.is_none() {
            let cells = text(columns.cells);
            let cells_est = text(columns.cells_estimate);
            if !cells.is_empty() {
                self.cell_count = Some(parse_u64_or(cells, 0).map_err(|e| at_row(e, row))?);
            } else if !cells_est.is_empty() {
                self.cell_count = Some(parse_u64_or(cells_est, 0).map_err(|e| at_row(e, row))?);
            }
        }

        Ok(r)
    }

    /// Read one raw line, without its terminator, feeding the peeker first.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let n = self.buf.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }

        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }

        if let Some(peeker) = self.peeker.as_mut() {
            peeker(&line)?;
        }

        Ok(Some(line))
    }
}

fn at_row(e: ClonescanError, row: usize) -> ClonescanError {
    match e {
        ClonescanError::Parse(msg) => ClonescanError::Parse(format!("row {}: {}", row, msg)),
        other => other,
    }
}

fn parse_f64(value: &str, what: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| ClonescanError::Parse(format!("bad {} value: {:?}", what, value)))
}

fn parse_u64_or(value: &str, default: u64) -> Result<u64> {
    if value.is_empty() {
        return Ok(default);
    }
    value
        .parse::<u64>()
        .map_err(|_| ClonescanError::Parse(format!("bad count value: {:?}", value)))
}

fn parse_i32_or(value: &str, default: i32) -> Result<i32> {
    if value.is_empty() {
        return Ok(default);
    }
    value
        .parse::<i32>()
        .map_err(|_| ClonescanError::Parse(format!("bad index value: {:?}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FrameType;

    const V3_HEADER: &str = "rearrangement\tamino_acid\tframe_type\ttemplates\tv_resolved\td_resolved\tj_resolved\tcdr3_length\tv_index\td_index\tj_index\tn1_index\tn2_index\tv_shm_indexes\tsequence_tags";

    fn v3_doc(rows: &[&str]) -> String {
        let mut doc = String::new();
        doc.push_str(V3_HEADER);
        doc.push('\n');
        for row in rows {
            doc.push_str(row);
            doc.push('\n');
        }
        doc
    }

    #[test]
    fn test_v3_basic() {
        let doc = v3_doc(&[
            "ACGTACGT\tCASS\tIn\t12\tTCRBV05-01\t\tTCRBJ02-01\t4\t2\t-1\t6\t-1\t-1\t\t",
            "GGGGCCCC\tCAWS\tOut\t3\tTCRBV07-02\t\tTCRBJ01-01\t4\t1\t-1\t5\t-1\t-1\t3,7\tdx",
        ]);

        let mut reader = Reader::new(doc.as_bytes(), 0);

        let r = reader.read_next().unwrap().unwrap();
        assert_eq!(r.rearrangement, "ACGTACGT");
        assert_eq!(r.amino_acid, "CASS");
        assert_eq!(r.frame_type, FrameType::In);
        assert_eq!(r.count, 12);
        assert_eq!(r.cdr3, "GTAC");
        assert_eq!(r.locus, Locus::Tcrb);
        assert!(!r.dx);
        assert!(r.v_shm_indices.is_none());

        let r = reader.read_next().unwrap().unwrap();
        assert_eq!(r.count, 3);
        assert!(r.dx);
        assert_eq!(r.v_shm_indices, Some(vec![3, 7]));

        assert!(reader.read_next().unwrap().is_none());
        assert_eq!(reader.next_row_index(), 2);
    }

    #[test]
    fn test_v2_header_synonyms() {
        let doc = "nucleotide\taminoAcid\tsequenceStatus\tcount (templates/reads)\tvMaxResolved\tdMaxResolved\tjMaxResolved\tcdr3Length\tvIndex\tdIndex\tjIndex\tn1Index\tn2Index\n\
                   ACGT\tCA\tIn\t7\tIGHV3-23*01\t\tIGHJ4*02\t2\t1\t-1\t3\t-1\t-1\n";

        let mut reader = Reader::new(doc.as_bytes(), 0);
        let r = reader.read_next().unwrap().unwrap();
        assert_eq!(r.count, 7);
        assert_eq!(r.locus, Locus::Igh);
        assert_eq!(r.cdr3, "CG");
    }

    #[test]
    fn test_metadata_cells_and_milliliters() {
        let doc = format!(
            "#estTotalNucleatedCells=41230.5\n#sampleMilliliters=2.5\n{}",
            v3_doc(&["ACGT\tCA\tIn\t1\tTCRBV01\t\tTCRBJ01\t2\t0\t-1\t2\t-1\t-1\t\t"])
        );

        let mut reader = Reader::new(doc.as_bytes(), 0);
        reader.read_next().unwrap().unwrap();
        assert_eq!(reader.discovered_cell_count(), Some(41230));
        assert_eq!(reader.discovered_milliliters(), Some(2.5));
    }

    #[test]
    fn test_metadata_mass_estimate() {
        let below = format!(
            "#productionPCRAmountofTemplate=10.0\n{}",
            v3_doc(&["ACGT\tCA\tIn\t1\tTCRBV01\t\tTCRBJ01\t2\t0\t-1\t2\t-1\t-1\t\t"])
        );
        let mut reader = Reader::new(below.as_bytes(), 0);
        reader.read_next().unwrap();
        assert_eq!(reader.discovered_cell_count(), None);

        let above = format!(
            "#productionPCRAmountofTemplate=13.0\n{}",
            v3_doc(&["ACGT\tCA\tIn\t1\tTCRBV01\t\tTCRBJ01\t2\t0\t-1\t2\t-1\t-1\t\t"])
        );
        let mut reader = Reader::new(above.as_bytes(), 0);
        reader.read_next().unwrap();
        // 13 ng at 6.5 pg per cell
        assert_eq!(reader.discovered_cell_count(), Some(2000));
    }

    #[test]
    fn test_explicit_cells_beat_mass_estimate() {
        let doc = format!(
            "#estTotalNucleatedCells=500\n#productionPCRAmountofTemplate=130.0\n{}",
            v3_doc(&["ACGT\tCA\tIn\t1\tTCRBV01\t\tTCRBJ01\t2\t0\t-1\t2\t-1\t-1\t\t"])
        );
        let mut reader = Reader::new(doc.as_bytes(), 0);
        reader.read_next().unwrap();
        assert_eq!(reader.discovered_cell_count(), Some(500));
    }

    #[test]
    fn test_malformed_count_aborts() {
        let doc = v3_doc(&["ACGT\tCA\tIn\tnotanumber\tTCRBV01\t\tTCRBJ01\t2\t0\t-1\t2\t-1\t-1\t\t"]);
        let mut reader = Reader::new(doc.as_bytes(), 0);
        assert!(matches!(
            reader.read_next(),
            Err(ClonescanError::Parse(_))
        ));
    }

    #[test]
    fn test_bad_frame_type_aborts() {
        let doc = v3_doc(&["ACGT\tCA\tSideways\t1\tTCRBV01\t\tTCRBJ01\t2\t0\t-1\t2\t-1\t-1\t\t"]);
        let mut reader = Reader::new(doc.as_bytes(), 0);
        assert!(reader.read_next().is_err());
    }

    #[test]
    fn test_start_row_offset() {
        let doc = v3_doc(&[
            "AAAA\tCA\tIn\t1\tTCRBV01\t\tTCRBJ01\t2\t0\t-1\t2\t-1\t-1\t\t",
            "CCCC\tCA\tIn\t2\tTCRBV01\t\tTCRBJ01\t2\t0\t-1\t2\t-1\t-1\t\t",
            "GGGG\tCA\tIn\t3\tTCRBV01\t\tTCRBJ01\t2\t0\t-1\t2\t-1\t-1\t\t",
        ]);

        let mut reader = Reader::new(doc.as_bytes(), 2);
        let r = reader.read_next().unwrap().unwrap();
        assert_eq!(r.rearrangement, "GGGG");
        assert_eq!(reader.next_row_index(), 3);
    }

    #[test]
    fn test_absent_columns_stay_default() {
        // a minimal schema: counts and indices absent
        let doc = "rearrangement\tamino_acid\tframe_type\tv_resolved\tj_resolved\n\
                   ACGT\tCA\tIn\tTCRGV09\tTCRGJ01\n";

        let mut reader = Reader::new(doc.as_bytes(), 0);
        let r = reader.read_next().unwrap().unwrap();
        assert_eq!(r.count, 0);
        assert_eq!(r.v_index, -1);
        assert_eq!(r.cdr3, "");
        assert_eq!(r.locus, Locus::Tcrg);
    }

    #[test]
    fn test_input_template_estimate_overrides_count() {
        let doc = "rearrangement\tamino_acid\tframe_type\ttemplates\tv_resolved\tj_resolved\tinputTemplateEstimate\n\
                   ACGT\tCA\tIn\t10\tTCRBV01\tTCRBJ01\t25\n";

        let mut reader = Reader::new(doc.as_bytes(), 0);
        let r = reader.read_next().unwrap().unwrap();
        assert_eq!(r.count, 25);
    }

    #[test]
    fn test_peeker_sees_every_line() {
        let doc = format!(
            "#sampleMilliliters=1.0\n{}",
            v3_doc(&["ACGT\tCA\tIn\t1\tTCRBV01\t\tTCRBJ01\t2\t0\t-1\t2\t-1\t-1\t\t"])
        );

        let mut seen: Vec<String> = Vec::new();
        let mut reader = Reader::with_peeker(
            doc.as_bytes(),
            0,
            Box::new(|line: &str| {
                seen.push(line.to_string());
                Ok(())
            }),
        );
        while reader.read_next().unwrap().is_some() {}
        drop(reader);

        // metadata line, header, one data row
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], "#sampleMilliliters=1.0");
        assert!(seen[1].starts_with("rearrangement\t"));
        assert!(seen[2].starts_with("ACGT\t"));
    }
}
