use crate::{
    links,
    options::{Model, Pathloss},
    report::{Failure, Report},
};
use anyhow::Result;
use log::info;
use propah::{FreeSpace, Hata, Indoor, PathLoss};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
};

impl Pathloss {
    pub fn run(&self) -> Result<Report> {
        let model = self.model()?;
        let links = links::load(&self.links)?;
        info!(
            "{:?} path loss of {} links at {} MHz",
            self.model,
            links.len(),
            self.freq
        );

        let tmp_path = self.out.with_extension("tmp");
        let mut failures = Vec::new();
        {
            let mut wtr = BufWriter::new(File::create(&tmp_path)?);
            writeln!(wtr, "index,distance_m,loss_db,success")?;
            for (index, link) in links.iter().enumerate() {
                let distance = link.length();
                if !(distance.is_finite() && distance > 0.0) {
                    failures.push(Failure {
                        index,
                        reason: format!("no path loss at distance {distance}"),
                    });
                    continue;
                }
                let loss = model.loss_db(distance);
                let success = link.success.map(|s| s.to_string()).unwrap_or_default();
                writeln!(wtr, "{index},{distance:.3},{loss:.3},{success}")?;
            }
            wtr.flush()?;
        }
        fs::rename(tmp_path, &self.out)?;

        let report = Report::new(links.len(), links.len() - failures.len(), failures);
        report.finish(None)?;
        Ok(report)
    }

    fn model(&self) -> Result<Box<dyn PathLoss>> {
        Ok(match self.model {
            Model::FreeSpace => Box::new(FreeSpace::new(self.freq)?),
            Model::Hata => Box::new(
                Hata::builder()
                    .freq(self.freq)
                    .base_height(self.base_height)
                    .mobile_height(self.mobile_height)
                    .environment(self.environment.into())
                    .city_size(self.city_size.into())
                    .build()?,
            ),
            Model::Indoor => Box::new(Indoor::new(self.freq, self.floors, self.building.into())?),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        fixtures::{link_args, scratch_dir, write_links},
        options::{BuildingArg, CitySizeArg, EnvironmentArg, Model, Pathloss},
    };
    use approx::assert_relative_eq;
    use std::{fs, path::Path};

    fn pathloss_cmd(links: &Path, out: &Path, model: Model) -> Pathloss {
        Pathloss {
            links: link_args(links, None),
            model,
            freq: 868.0,
            base_height: 30.0,
            mobile_height: 1.5,
            environment: EnvironmentArg::Urban,
            city_size: CitySizeArg::Small,
            floors: 0,
            building: BuildingArg::Office,
            out: out.to_owned(),
        }
    }

    #[test]
    fn test_free_space_csv() {
        let dir = scratch_dir("pathloss");
        let links = write_links(
            &dir,
            &[((0.0, 0.0), (600.0, 800.0)), ((5.0, 5.0), (5.0, 5.0)), ((0.0, 0.0), (0.0, 10.0))],
        );
        let out = dir.join("loss.csv");
        let report = pathloss_cmd(&links, &out, Model::FreeSpace).run().unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failures[0].index, 1);

        let csv = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "index,distance_m,loss_db,success");
        assert_eq!(lines.len(), 3);
        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(fields[0], "0");
        assert_eq!(fields[1], "1000.000");
        assert_relative_eq!(fields[2].parse::<f64>().unwrap(), 91.220, epsilon = 1e-3);
        assert_eq!(fields[3], "true");
        assert!(lines[2].starts_with("2,10.000,"));
        assert!(lines[2].ends_with(",true"));
    }

    #[test]
    fn test_invalid_model_parameters() {
        let dir = scratch_dir("pathloss-invalid");
        let links = write_links(&dir, &[((0.0, 0.0), (10.0, 0.0))]);
        let mut cmd = pathloss_cmd(&links, &dir.join("loss.csv"), Model::Indoor);
        cmd.floors = 5;
        assert!(cmd.run().is_err());
        let mut cmd = pathloss_cmd(&links, &dir.join("loss.csv"), Model::Hata);
        cmd.base_height = 0.0;
        assert!(cmd.run().is_err());
    }
}
