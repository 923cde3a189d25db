use rayon::prelude::*;
use tmtquant_core::protein::ProteinGroup;
use tmtquant_core::psm::{Psm, PROTEIN_ID};
use tmtquant_core::quant::{QuantRow, QuantTable};

use crate::runner::Runner;

impl Runner {
    pub fn serialize_quant(&self, row: &QuantRow, psm: &Psm, columns: usize) -> csv::ByteRecord {
        let mut record = csv::ByteRecord::new();
        // Short rows in the identification table are padded to its header
        for ix in 0..columns {
            record.push_field(psm.fields.get(ix).map(String::as_str).unwrap_or_default().as_bytes());
        }
        for value in &row.intensities {
            record.push_field(ryu::Buffer::new().format(*value).as_bytes());
        }
        record.push_field(ryu::Buffer::new().format(row.spectrum_intensity).as_bytes());
        if let Some(corrected) = &row.corrected {
            for value in corrected {
                record.push_field(ryu::Buffer::new().format(*value).as_bytes());
            }
        }
        record
    }

    /// Identification columns of every quantified PSM, followed by its
    /// reporter intensities
    pub fn write_psms(
        &self,
        id_headers: &[String],
        quant: &QuantTable,
        psms: &[Psm],
    ) -> anyhow::Result<String> {
        let path = self.make_path("tmt_out.txt");

        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(vec![]);

        let mut headers = csv::ByteRecord::new();
        for header in id_headers.iter().chain(quant.headers().iter()) {
            headers.push_field(header.as_bytes());
        }
        wtr.write_byte_record(&headers)?;

        let records = quant
            .rows
            .par_iter()
            .filter_map(|row| {
                let psm = psms.get(row.psm)?;
                Some(self.serialize_quant(row, psm, id_headers.len()))
            })
            .collect::<Vec<_>>();

        for record in records {
            wtr.write_byte_record(&record)?;
        }
        wtr.flush()?;

        let bytes = wtr.into_inner()?;
        std::fs::write(&path, bytes)?;
        Ok(path.display().to_string())
    }

    pub fn write_proteins(
        &self,
        quant: &QuantTable,
        proteins: &[ProteinGroup],
    ) -> anyhow::Result<String> {
        let path = self.make_path("tmt_protein_out.txt");

        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(vec![]);

        let mut headers = csv::ByteRecord::from(vec![PROTEIN_ID]);
        for header in quant.channel_headers() {
            headers.push_field(header.as_bytes());
        }
        wtr.write_byte_record(&headers)?;

        for group in proteins {
            let mut record = csv::ByteRecord::new();
            record.push_field(group.id.as_bytes());
            for value in &group.intensities {
                record.push_field(ryu::Buffer::new().format(*value).as_bytes());
            }
            wtr.write_byte_record(&record)?;
        }
        wtr.flush()?;

        let bytes = wtr.into_inner()?;
        std::fs::write(&path, bytes)?;
        Ok(path.display().to_string())
    }
}
