use crate::{dispatch::Dispatcher, links, options::Obstruction, progress, report::Report};
use anyhow::Result;
use log::info;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
};
use terrain::{columns_for_length, sample, GridSpec, SampleMode, TerrainError};

impl Obstruction {
    pub fn run(&self) -> Result<Report> {
        if !(self.dist_per_col.is_finite() && self.dist_per_col > 0.0) {
            return Err(TerrainError::DistPerCol(self.dist_per_col).into());
        }
        // Validates the row count before any work is done.
        GridSpec::new(self.rows, 1)?;
        let tmp_path = self.out.with_extension("tmp");
        let tmp_file = File::create(&tmp_path)?;

        let links = links::load(&self.links)?;
        let (rectangles, mut failures) = links::rectangles(
            &links,
            self.dispatch.relative_buffer,
            self.dispatch.max_dist,
        )?;
        info!(
            "estimating obstruction of {} links, a sample every {} units",
            rectangles.len(),
            self.dist_per_col
        );

        let progress_group = progress::group();
        let pb = progress_group.add(progress::bar(
            "Obstruction".to_string(),
            rectangles.len() as u64,
        ));
        let outcome = Dispatcher::from_args(&self.dispatch)
            .progress(pb)
            .run(rectangles, |raster, rect, deadline| {
                let cols = columns_for_length(rect.length(), self.dist_per_col)?;
                let spec = GridSpec::new(self.rows, cols)?
                    .mode(SampleMode::Clearance)
                    .resampling(self.dispatch.resampling.into())
                    .nodata_fill(self.dispatch.nodata_fill);
                let grid = sample(rect, raster, &spec, deadline)?;
                deadline.check()?;
                Ok(grid.obstruction())
            })?;

        {
            let mut wtr = BufWriter::new(tmp_file);
            writeln!(wtr, "index,obstruction")?;
            for (index, obstruction) in &outcome.completed {
                writeln!(wtr, "{index},{obstruction}")?;
            }
            wtr.flush()?;
        }
        fs::rename(tmp_path, &self.out)?;

        failures.extend(outcome.failures);
        let report = Report::new(links.len(), outcome.completed.len(), failures);
        report.finish(self.dispatch.report.as_deref())?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        fixtures::{dispatch_args, link_args, scratch_dir, write_links, write_raster},
        options::Obstruction,
    };
    use std::{fs, io, path::Path};
    use terrain::TerrainError;

    fn obstruction_cmd(links: &Path, raster: &Path, out: &Path) -> Obstruction {
        Obstruction {
            links: link_args(links, None),
            dispatch: dispatch_args(raster),
            rows: 1,
            dist_per_col: 2.0,
            out: out.to_owned(),
        }
    }

    #[test]
    fn test_flat_and_raised_terrain() {
        let dir = scratch_dir("obstruction");
        let links = write_links(&dir, &[((5.0, 10.0), (25.0, 10.0)), ((5.0, 20.0), (25.0, 20.0))]);
        let flat = write_raster(&dir, "flat.asc", (30, 30), |_, _| -10.0);
        let wall = write_raster(&dir, "wall.asc", (30, 30), |_, _| 100.0);

        let out = dir.join("flat.csv");
        let report = obstruction_cmd(&links, &flat, &out).run().unwrap();
        assert_eq!(report.succeeded, 2);
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "index,obstruction\n0,0\n1,0\n"
        );

        let out = dir.join("wall.csv");
        obstruction_cmd(&links, &wall, &out).run().unwrap();
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "index,obstruction\n0,1\n1,1\n"
        );
    }

    #[test]
    fn test_failed_links_are_omitted() {
        let dir = scratch_dir("obstruction-failed");
        let links = write_links(&dir, &[((5.0, 10.0), (50.0, 10.0)), ((5.0, 20.0), (25.0, 20.0))]);
        let raster = write_raster(&dir, "flat.asc", (30, 30), |_, _| -10.0);
        let out = dir.join("out.csv");
        let report = obstruction_cmd(&links, &raster, &out).run().unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 0);
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "index,obstruction\n1,0\n"
        );
    }

    #[test]
    fn test_unwritable_out_aborts_before_loading_links() {
        let dir = scratch_dir("obstruction-unwritable");
        let raster = write_raster(&dir, "flat.asc", (30, 30), |_, _| -10.0);
        // Not a FeatureCollection, so loading would fail with a schema error.
        let links = dir.join("links.geojson");
        fs::write(&links, r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#).unwrap();
        let out = dir.join("no").join("such").join("out.csv");
        let err = obstruction_cmd(&links, &raster, &out).run().unwrap_err();
        assert_eq!(
            err.downcast_ref::<io::Error>().map(io::Error::kind),
            Some(io::ErrorKind::NotFound)
        );
        assert!(err.downcast_ref::<TerrainError>().is_none());
    }

    #[test]
    fn test_invalid_dist_per_col() {
        let dir = scratch_dir("obstruction-dist");
        let links = write_links(&dir, &[((5.0, 10.0), (25.0, 10.0))]);
        let raster = write_raster(&dir, "flat.asc", (30, 30), |_, _| -10.0);
        let mut cmd = obstruction_cmd(&links, &raster, &dir.join("out.csv"));
        cmd.dist_per_col = 0.0;
        let err = cmd.run().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TerrainError>(),
            Some(TerrainError::DistPerCol(_))
        ));
    }
}
