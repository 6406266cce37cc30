use crate::{dispatch::Dispatcher, links, options::Sample, progress, report::Report};
use anyhow::{bail, Result};
use log::info;
use std::{fs, io};
use terrain::{sample, GridSpec, SampleMode};

impl Sample {
    pub fn run(&self) -> Result<Report> {
        let spec = GridSpec::new(self.rows, self.cols)?
            .mode(if self.clearance {
                SampleMode::Clearance
            } else {
                SampleMode::Elevation
            })
            .resampling(self.dispatch.resampling.into())
            .nodata_fill(self.dispatch.nodata_fill);
        match fs::create_dir(&self.out_dir) {
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                bail!("output directory {:?} already exists", self.out_dir)
            }
            res => res?,
        }

        let links = links::load(&self.links)?;
        let (rectangles, mut failures) = links::rectangles(
            &links,
            self.dispatch.relative_buffer,
            self.dispatch.max_dist,
        )?;
        info!(
            "sampling {} links into {:?}",
            rectangles.len(),
            self.out_dir
        );

        let progress_group = progress::group();
        let pb = progress_group.add(progress::bar(
            "Sample links".to_string(),
            rectangles.len() as u64,
        ));
        let outcome = Dispatcher::from_args(&self.dispatch)
            .progress(pb)
            .run(rectangles, |raster, rect, deadline| {
                let grid = sample(rect, raster, &spec, deadline)?;
                deadline.check()?;
                grid.save(&self.out_dir, self.precision)
            })?;

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
        options::Sample,
    };
    use approx::assert_relative_eq;
    use std::{fs, path::Path};

    fn sample_cmd(links: &Path, raster: &Path, out_dir: &Path, max_size: Option<usize>) -> Sample {
        Sample {
            links: link_args(links, max_size),
            dispatch: dispatch_args(raster),
            rows: 2,
            cols: 3,
            clearance: false,
            precision: 2,
            out_dir: out_dir.to_owned(),
        }
    }

    fn csv_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_max_size_limits_outputs() {
        let dir = scratch_dir("sample-max");
        let raster = write_raster(&dir, "dsm.asc", (60, 60), |col, row| (col * row) as f32);
        let lines: Vec<_> = (0..100)
            .map(|i| {
                let y = 10.0 + f64::from(i % 40);
                ((10.0, y), (40.0, y + 5.0))
            })
            .collect();
        let links = write_links(&dir, &lines);
        let out_dir = dir.join("out");

        let report = sample_cmd(&links, &raster, &out_dir, Some(5)).run().unwrap();
        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded, 5);
        assert!(report.failures.is_empty());
        assert_eq!(
            csv_files(&out_dir),
            ["0.csv", "1.csv", "2.csv", "3.csv", "4.csv"]
        );
    }

    #[test]
    fn test_existing_out_dir_is_rejected() {
        let dir = scratch_dir("sample-exists");
        let raster = write_raster(&dir, "dsm.asc", (10, 10), |_, _| 1.0);
        let links = write_links(&dir, &[((2.0, 5.0), (8.0, 5.0))]);
        let out_dir = dir.join("out");
        fs::create_dir(&out_dir).unwrap();
        let err = sample_cmd(&links, &raster, &out_dir, None).run().unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(csv_files(&out_dir).is_empty());
    }

    #[test]
    fn test_runs_are_reproducible() {
        let dir = scratch_dir("sample-repro");
        let raster = write_raster(&dir, "dsm.asc", (40, 40), |col, row| {
            (col as f32).mul_add(0.5, row as f32)
        });
        let lines: Vec<_> = (0..12)
            .map(|i| ((5.0 + f64::from(i), 8.0), (20.0, 30.0 - f64::from(i))))
            .collect();
        let links = write_links(&dir, &lines);

        let first = dir.join("first");
        let second = dir.join("second");
        sample_cmd(&links, &raster, &first, None).run().unwrap();
        let mut cmd = sample_cmd(&links, &raster, &second, None);
        cmd.dispatch.workers = Some(1);
        cmd.run().unwrap();

        assert_eq!(csv_files(&first), csv_files(&second));
        for name in csv_files(&first) {
            assert_eq!(
                fs::read(first.join(&name)).unwrap(),
                fs::read(second.join(&name)).unwrap(),
                "{name} differs"
            );
        }
    }

    #[test]
    fn test_two_by_three_grid() {
        let dir = scratch_dir("sample-2x3");
        // Each cell holds its column index.
        let raster = write_raster(&dir, "dsm.asc", (20, 20), |col, _| col as f32);
        let links = write_links(&dir, &[((5.5, 10.0), (15.5, 10.0))]);
        let out_dir = dir.join("out");
        sample_cmd(&links, &raster, &out_dir, None).run().unwrap();

        let csv = fs::read_to_string(out_dir.join("0.csv")).unwrap();
        let rows: Vec<Vec<f64>> = csv
            .lines()
            .map(|line| line.split(',').map(|v| v.parse().unwrap()).collect())
            .collect();
        assert_eq!(rows.len(), 2);
        // Window spans x = 4.5..16.5, sampled at 4.5, 10.5, 16.5.
        for row in rows {
            assert_eq!(row.len(), 3);
            assert_relative_eq!(row[0], 4.0);
            assert_relative_eq!(row[1], 10.0);
            assert_relative_eq!(row[2], 16.0);
        }
    }

    #[test]
    fn test_out_of_coverage_link_is_reported() {
        let dir = scratch_dir("sample-coverage");
        let raster = write_raster(&dir, "dsm.asc", (20, 20), |_, _| 3.0);
        let links = write_links(
            &dir,
            &[((2.0, 5.0), (12.0, 5.0)), ((10.0, 10.0), (40.0, 10.0)), ((3.0, 3.0), (3.0, 3.0))],
        );
        let out_dir = dir.join("out");
        let report = sample_cmd(&links, &raster, &out_dir, None).run().unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(
            report.failures.iter().map(|f| f.index).collect::<Vec<_>>(),
            [1, 2]
        );
        assert_eq!(csv_files(&out_dir), ["0.csv"]);
    }
}
