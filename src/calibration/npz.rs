//! NumPy `.npz` calibration container

use std::{
    io::{Read, Seek, Write},
    path::Path,
    time::Instant,
};

use npyz::{npz::NpzArchive, npz::NpzWriter, WriterBuilder};

use super::{shape_error, Calibration, CalibrationError, PixelScales, Result, SpotGrid};
use crate::psf::Trace;

/// Reads array `name` as (shape, row-major values)
fn read<T, R>(npz: &mut NpzArchive<R>, name: &str) -> Result<Option<(Vec<usize>, Vec<T>)>>
where
    T: npyz::Deserialize,
    R: Read + Seek,
{
    let read_error = |e| CalibrationError::Read(e, name.to_string());
    match npz.by_name(name).map_err(read_error)? {
        Some(npy) => {
            let shape: Vec<usize> = npy.shape().iter().map(|&n| n as usize).collect();
            let data = npy.into_vec::<T>().map_err(read_error)?;
            Ok(Some((shape, data)))
        }
        None => Ok(None),
    }
}

fn required<T, R>(npz: &mut NpzArchive<R>, name: &str) -> Result<(Vec<usize>, Vec<T>)>
where
    T: npyz::Deserialize,
    R: Read + Seek,
{
    read(npz, name)?.ok_or_else(|| CalibrationError::Missing(name.to_string()))
}

fn vector<R: Read + Seek>(npz: &mut NpzArchive<R>, name: &str) -> Result<Vec<f64>> {
    let (shape, data) = required::<f64, _>(npz, name)?;
    if shape.len() != 1 {
        return Err(shape_error(name, &shape, "[n]"));
    }
    Ok(data)
}

fn scalar<T, R>(npz: &mut NpzArchive<R>, name: &str) -> Result<T>
where
    T: npyz::Deserialize + Copy,
    R: Read + Seek,
{
    let (shape, data) = required::<T, _>(npz, name)?;
    match data.as_slice() {
        [value] => Ok(*value),
        _ => Err(shape_error(name, &shape, "a scalar")),
    }
}

fn matrix<R: Read + Seek>(
    npz: &mut NpzArchive<R>,
    name: &str,
    nrows: usize,
) -> Result<Option<(usize, Vec<f64>)>> {
    match read::<f64, _>(npz, name)? {
        Some((shape, data)) => match shape.as_slice() {
            &[n, ncols] if n == nrows => Ok(Some((ncols, data))),
            _ => Err(shape_error(name, &shape, format!("[{nrows}, nwave]"))),
        },
        None => Ok(None),
    }
}

impl Calibration {
    /// Loads the calibration from a NumPy `.npz` archive
    ///
    /// The archive must hold the arrays
    /// `SPOTS[nslit,nwave_spot,ny,nx]`, `FIBERPOS[nspec]`, `SPOTPOS[nslit]`,
    /// `SPOTWAVE[nwave_spot]`, `X[nspec,nwave]`, `Y[nspec,nwave]` and
    /// `WAVELENGTH[nspec,nwave]` (or `LOGLAM[nspec,nwave]`, the base-10 logarithm
    /// of the wavelengths), the scalars `CCDPIXSZ` and `PIXSIZE`
    /// (detector and spot pixel sizes) and the integer scalars `NPIX_X` and `NPIX_Y`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading {:?}...", path);
        let now = Instant::now();
        let mut npz =
            NpzArchive::open(path).map_err(|e| CalibrationError::Open(e, path.to_path_buf()))?;

        let (shape, data) = required::<f64, _>(&mut npz, "SPOTS")?;
        let spots = match shape.as_slice() {
            &[nslit, nwave, ny, nx] => SpotGrid::new(data, [nslit, nwave, ny, nx])?,
            _ => return Err(shape_error("SPOTS", &shape, "[nslit, nwave_spot, ny, nx]")),
        };
        let fiberpos = vector(&mut npz, "FIBERPOS")?;
        let spotpos = vector(&mut npz, "SPOTPOS")?;
        let spotwave = vector(&mut npz, "SPOTWAVE")?;
        let scales = PixelScales::new(
            scalar::<f64, _>(&mut npz, "CCDPIXSZ")?,
            scalar::<f64, _>(&mut npz, "PIXSIZE")?,
        )?;
        let npix_x = scalar::<i64, _>(&mut npz, "NPIX_X")?;
        let npix_y = scalar::<i64, _>(&mut npz, "NPIX_Y")?;
        if npix_x <= 0 {
            return Err(CalibrationError::NotPositive("NPIX_X", npix_x as f64));
        }
        if npix_y <= 0 {
            return Err(CalibrationError::NotPositive("NPIX_Y", npix_y as f64));
        }

        let nspec = fiberpos.len();
        let (nwave, wavelength) = match matrix(&mut npz, "WAVELENGTH", nspec)? {
            Some(wavelength) => wavelength,
            None => {
                let (nwave, loglam) = matrix(&mut npz, "LOGLAM", nspec)?
                    .ok_or_else(|| CalibrationError::Missing("WAVELENGTH".to_string()))?;
                (nwave, loglam.into_iter().map(|l| 10f64.powf(l)).collect())
            }
        };
        let (nx, x) = matrix(&mut npz, "X", nspec)?
            .ok_or_else(|| CalibrationError::Missing("X".to_string()))?;
        let (ny, y) = matrix(&mut npz, "Y", nspec)?
            .ok_or_else(|| CalibrationError::Missing("Y".to_string()))?;
        if nx != nwave || ny != nwave {
            return Err(shape_error(
                "X/Y",
                &[nspec, nx, ny],
                format!("[{nspec}, {nwave}]"),
            ));
        }
        let traces: Vec<_> = if nwave == 0 {
            Vec::new()
        } else {
            wavelength
                .chunks(nwave)
                .zip(x.chunks(nwave))
                .zip(y.chunks(nwave))
                .map(|((w, x), y)| Trace::new(w.to_vec(), x.to_vec(), y.to_vec()))
                .collect()
        };

        let calibration = Self::new(
            spots,
            fiberpos,
            spotpos,
            spotwave,
            scales,
            (npix_x as usize, npix_y as usize),
            traces,
        )?;
        log::info!(
            "{:?} loaded in {:}s ({} fibers x {} wavelengths)",
            path,
            now.elapsed().as_secs_f64(),
            calibration.nspec(),
            calibration.nwave()
        );
        Ok(calibration)
    }

    /// Saves the calibration to a NumPy `.npz` archive readable by [`Calibration::load`]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        log::info!("Saving {:?}...", path);
        let write_error = |e| CalibrationError::Write(e, path.to_path_buf());
        let mut npz = NpzWriter::create(path).map_err(write_error)?;

        let [nslit, nwave_spot, ny, nx] = self.spots.shape();
        let (nspec, nwave) = (self.nspec(), self.nwave());
        let flat = |f: fn(&Trace) -> &[f64]| -> Vec<f64> {
            self.traces.iter().flat_map(|t| f(t).to_vec()).collect()
        };
        let traces = [
            ("WAVELENGTH", flat(Trace::wavelength)),
            ("X", flat(Trace::x)),
            ("Y", flat(Trace::y)),
        ];

        write(
            &mut npz,
            "SPOTS",
            &[nslit, nwave_spot, ny, nx],
            self.spots.as_slice().to_vec(),
        )
        .map_err(write_error)?;
        for (name, data) in [
            ("FIBERPOS", &self.fiberpos),
            ("SPOTPOS", &self.spotpos),
            ("SPOTWAVE", &self.spotwave),
        ] {
            write(&mut npz, name, &[data.len()], data.clone()).map_err(write_error)?;
        }
        for (name, data) in traces {
            write(&mut npz, name, &[nspec, nwave], data).map_err(write_error)?;
        }
        write(&mut npz, "CCDPIXSZ", &[], vec![self.scales.ccd]).map_err(write_error)?;
        write(&mut npz, "PIXSIZE", &[], vec![self.scales.spot]).map_err(write_error)?;
        let (npix_x, npix_y) = self.npix;
        write(&mut npz, "NPIX_X", &[], vec![npix_x as i64]).map_err(write_error)?;
        write(&mut npz, "NPIX_Y", &[], vec![npix_y as i64]).map_err(write_error)?;
        Ok(())
    }
}

fn write<T, W>(
    npz: &mut NpzWriter<W>,
    name: &str,
    shape: &[usize],
    data: Vec<T>,
) -> std::io::Result<()>
where
    T: npyz::AutoSerialize,
    W: Write + Seek,
{
    let shape: Vec<u64> = shape.iter().map(|&n| n as u64).collect();
    let mut writer = npz
        .array(name, Default::default())?
        .default_dtype()
        .shape(&shape)
        .begin_nd()?;
    writer.extend(data)?;
    writer.finish()
}
