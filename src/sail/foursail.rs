//! 4SAIL: four-stream canopy reflectance with hotspot
//!
//! The canopy is a horizontally homogeneous layer of leaves with reflectance
//! `rho` and transmittance `tau`, lying over a Lambertian soil. Geometric
//! factors depend only on the viewing geometry, the leaf angle distribution,
//! LAI and hotspot, so they are computed once and reused for every wavelength.
//!
//! ## Output naming
//!
//! The first letter(s) give the incident flux, the last one(s) the exiting
//! flux: `s` direct solar, `d` diffuse, `o` observer direction.
//! `r`/`t` are reflectance/transmittance of the canopy layer; a trailing `t`
//! (e.g. `rsot`) includes the soil.
//!
//! ## References
//!
//! - Verhoef, W. (1984). Light scattering by leaf layers with application to canopy
//!   reflectance modeling: the SAIL model. RSE 16, 125-141.
//! - Verhoef, W., Jia, L., Xiao, Q., Su, Z. (2007). Unified optical-thermal four-stream
//!   radiative transfer theory for homogeneous vegetation canopies. IEEE TGRS 45, 1808-1822.

use std::f64::consts::PI;

use super::SailError;
use super::lidf::{LeafAngleDistribution, class_centres};

/// Sun and sensor angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewGeometry {
    pub tts: f64, // Solar zenith angle
    pub tto: f64, // Sensor zenith angle
    pub psi: f64, // Relative azimuth between sun and sensor
}

/// All 4SAIL outputs. The three direct transmittances do not depend on the
/// wavelength.
#[derive(Debug, Clone, Default)]
pub struct SailOutput {
    pub tss: f64,
    pub too: f64,
    pub tsstoo: f64,
    pub rdd: Vec<f64>,
    pub tdd: Vec<f64>,
    pub rsd: Vec<f64>,
    pub tsd: Vec<f64>,
    pub rdo: Vec<f64>,
    pub tdo: Vec<f64>,
    pub rso: Vec<f64>,
    pub rsos: Vec<f64>,
    pub rsod: Vec<f64>,
    pub rddt: Vec<f64>,
    pub rsdt: Vec<f64>,
    pub rdot: Vec<f64>,
    pub rsodt: Vec<f64>,
    pub rsost: Vec<f64>,
    pub rsot: Vec<f64>,
    pub gammasdf: Vec<f64>,
    pub gammasdb: Vec<f64>,
    pub gammaso: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
struct SpectralTerms {
    rdd: f64,
    tdd: f64,
    rsd: f64,
    tsd: f64,
    rdo: f64,
    tdo: f64,
    rso: f64,
    rsos: f64,
    rsod: f64,
    rddt: f64,
    rsdt: f64,
    rdot: f64,
    rsodt: f64,
    rsost: f64,
    rsot: f64,
    gammasdf: f64,
    gammasdb: f64,
    gammaso: f64,
}

impl SailOutput {
    fn with_capacity(n: usize) -> Self {
        let v = || Vec::with_capacity(n);
        Self {
            tss: 0.0,
            too: 0.0,
            tsstoo: 0.0,
            rdd: v(),
            tdd: v(),
            rsd: v(),
            tsd: v(),
            rdo: v(),
            tdo: v(),
            rso: v(),
            rsos: v(),
            rsod: v(),
            rddt: v(),
            rsdt: v(),
            rdot: v(),
            rsodt: v(),
            rsost: v(),
            rsot: v(),
            gammasdf: v(),
            gammasdb: v(),
            gammaso: v(),
        }
    }

    fn push(&mut self, t: SpectralTerms) {
        self.rdd.push(t.rdd);
        self.tdd.push(t.tdd);
        self.rsd.push(t.rsd);
        self.tsd.push(t.tsd);
        self.rdo.push(t.rdo);
        self.tdo.push(t.tdo);
        self.rso.push(t.rso);
        self.rsos.push(t.rsos);
        self.rsod.push(t.rsod);
        self.rddt.push(t.rddt);
        self.rsdt.push(t.rsdt);
        self.rdot.push(t.rdot);
        self.rsodt.push(t.rsodt);
        self.rsost.push(t.rsost);
        self.rsot.push(t.rsot);
        self.gammasdf.push(t.gammasdf);
        self.gammasdb.push(t.gammasdb);
        self.gammaso.push(t.gammaso);
    }
}

/// Interception and scattering fractions of one leaf inclination class.
#[derive(Debug, Clone, Copy)]
struct VolumeScattering {
    chi_s: f64,
    chi_o: f64,
    frho: f64,
    ftau: f64,
}

/// Volume scattering of a leaf class inclined `ttl` degrees (Verhoef, 1984).
fn volscatt(tts: f64, tto: f64, psi: f64, ttl: f64) -> VolumeScattering {
    let cts = tts.to_radians().cos();
    let cto = tto.to_radians().cos();
    let sts = tts.to_radians().sin();
    let sto = tto.to_radians().sin();
    let psir = psi.to_radians();
    let cospsi = psir.cos();
    let cttl = ttl.to_radians().cos();
    let sttl = ttl.to_radians().sin();

    let cs = cttl * cts;
    let co = cttl * cto;
    let ss = sttl * sts;
    let so = sttl * sto;

    // Azimuths where the leaf plane starts being lit (bts) or seen (bto)
    let cosbts = if ss.abs() > 1e-6 { -cs / ss } else { 5.0 };
    let cosbto = if so.abs() > 1e-6 { -co / so } else { 5.0 };

    let (bts, ds) = if cosbts.abs() < 1.0 {
        (cosbts.acos(), ss)
    } else {
        (PI, cs)
    };
    let chi_s = 2.0 / PI * ((bts - PI * 0.5) * cs + bts.sin() * ss);

    let (bto, dob) = if cosbto.abs() < 1.0 {
        (cosbto.acos(), so)
    } else if tto < 90.0 {
        (PI, co)
    } else {
        (0.0, -co)
    };
    let chi_o = 2.0 / PI * ((bto - PI * 0.5) * co + bto.sin() * so);

    // Auxiliary azimuths for the bidirectional scattering coefficient
    let btran1 = (bts - bto).abs();
    let btran2 = PI - (bts + bto - PI).abs();
    let (bt1, bt2, bt3) = if psir <= btran1 {
        (psir, btran1, btran2)
    } else if psir <= btran2 {
        (btran1, psir, btran2)
    } else {
        (btran1, btran2, psir)
    };

    let t1 = 2.0 * cs * co + ss * so * cospsi;
    let t2 = if bt2 > 0.0 {
        bt2.sin() * (2.0 * ds * dob + ss * so * bt1.cos() * bt3.cos())
    } else {
        0.0
    };

    let denom = 2.0 * PI * PI;
    let frho = (((PI - bt2) * t1 + t2) / denom).max(0.0);
    let ftau = ((-bt2 * t1 + t2) / denom).max(0.0);

    VolumeScattering {
        chi_s,
        chi_o,
        frho,
        ftau,
    }
}

/// J1 function with the singularity at k = l removed.
fn jfunc1(k: f64, l: f64, t: f64) -> f64 {
    let del = (k - l) * t;
    if del.abs() > 1e-3 {
        ((-l * t).exp() - (-k * t).exp()) / (k - l)
    } else {
        0.5 * t * ((-k * t).exp() + (-l * t).exp()) * (1.0 - del * del / 12.0)
    }
}

fn jfunc2(k: f64, l: f64, t: f64) -> f64 {
    (1.0 - (-(k + l) * t).exp()) / (k + l)
}

/// Wavelength-independent canopy factors.
#[derive(Debug, Clone, Copy)]
struct CanopyFactors {
    ks: f64,
    ko: f64,
    sdb: f64,
    sdf: f64,
    dob: f64,
    dof: f64,
    ddb: f64,
    ddf: f64,
    sob: f64,
    sof: f64,
    tss: f64,
    too: f64,
    tsstoo: f64,
    sumint: f64,
}

impl CanopyFactors {
    fn new(lidf: &[f64], lai: f64, hotspot: f64, geometry: &ViewGeometry) -> Self {
        let ViewGeometry { tts, tto, psi } = *geometry;
        let cts = tts.to_radians().cos();
        let cto = tto.to_radians().cos();
        let ctscto = cts * cto;
        let tants = tts.to_radians().tan();
        let tanto = tto.to_radians().tan();
        let cospsi = psi.to_radians().cos();
        let dso = (tants * tants + tanto * tanto - 2.0 * tants * tanto * cospsi)
            .max(0.0)
            .sqrt();

        // Weighted sums over the leaf inclination classes
        let (mut ks, mut ko, mut bf, mut sob, mut sof) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (ttl, freq) in class_centres().iter().zip(lidf) {
            let cttl = ttl.to_radians().cos();
            let vs = volscatt(tts, tto, psi, *ttl);
            ks += vs.chi_s / cts * freq;
            ko += vs.chi_o / cto * freq;
            bf += cttl * cttl * freq;
            sob += vs.frho * PI / ctscto * freq;
            sof += vs.ftau * PI / ctscto * freq;
        }

        let tss = (-ks * lai).exp();
        let too = (-ko * lai).exp();
        let (tsstoo, sumint) = hotspot_integral(ks, ko, lai, hotspot, dso, tss);

        Self {
            ks,
            ko,
            sdb: 0.5 * (ks + bf),
            sdf: 0.5 * (ks - bf),
            dob: 0.5 * (ko + bf),
            dof: 0.5 * (ko - bf),
            ddb: 0.5 * (1.0 + bf),
            ddf: 0.5 * (1.0 - bf),
            sob,
            sof,
            tss,
            too,
            tsstoo,
            sumint,
        }
    }
}

/// Bidirectional gap probability and the single-scattering integral,
/// integrated in 20 exponential Simpson steps of equal slope partition.
fn hotspot_integral(ks: f64, ko: f64, lai: f64, hotspot: f64, dso: f64, tss: f64) -> (f64, f64) {
    // Breon's 2/(K+k) correction
    let alf = if hotspot > 0.0 {
        (dso / hotspot) * 2.0 / (ks + ko)
    } else {
        1e36
    };

    if alf == 0.0 {
        // Pure hotspot: sun and view directions coincide
        return (tss, (1.0 - tss) / (ks * lai));
    }

    let fhot = lai * (ko * ks).sqrt();
    let fint = (1.0 - (-alf).exp()) * 0.05;
    let (mut x1, mut y1, mut f1) = (0.0, 0.0, 1.0);
    let mut sumint = 0.0;

    for istep in 1..=20 {
        let x2 = if istep < 20 {
            -(1.0 - istep as f64 * fint).ln() / alf
        } else {
            1.0
        };
        let y2 = -(ko + ks) * lai * x2 + fhot * (1.0 - (-alf * x2).exp()) / alf;
        let f2 = y2.exp();
        sumint += (f2 - f1) * (x2 - x1) / (y2 - y1);
        x1 = x2;
        y1 = y2;
        f1 = f2;
    }

    if sumint.is_nan() {
        sumint = 0.0;
    }

    (f1, sumint)
}

fn canopy_terms(f: &CanopyFactors, rho: f64, tau: f64, rsoil: f64, lai: f64) -> SpectralTerms {
    let sigb = (f.ddb * rho + f.ddf * tau).max(1e-36);
    let sigf = {
        let s = f.ddf * rho + f.ddb * tau;
        if s == 0.0 { 1e-36 } else { s }
    };
    let att = 1.0 - sigf;
    let m = (att * att - sigb * sigb).max(0.0).sqrt();
    let sb = f.sdb * rho + f.sdf * tau;
    let sf = f.sdf * rho + f.sdb * tau;
    let vb = f.dob * rho + f.dof * tau;
    let vf = f.dof * rho + f.dob * tau;
    let w = f.sob * rho + f.sof * tau;

    let (ks, ko, tss, too) = (f.ks, f.ko, f.tss, f.too);

    let e1 = (-m * lai).exp();
    let e2 = e1 * e1;
    let rinf = (att - m) / sigb;
    let rinf2 = rinf * rinf;
    let re = rinf * e1;
    let denom = 1.0 - rinf2 * e2;

    let j1ks = jfunc1(ks, m, lai);
    let j2ks = jfunc2(ks, m, lai);
    let j1ko = jfunc1(ko, m, lai);
    let j2ko = jfunc2(ko, m, lai);

    let pss = (sf + sb * rinf) * j1ks;
    let qss = (sf * rinf + sb) * j2ks;
    let pv = (vf + vb * rinf) * j1ko;
    let qv = (vf * rinf + vb) * j2ko;

    let tdd = (1.0 - rinf2) * e1 / denom;
    let rdd = rinf * (1.0 - e2) / denom;
    let tsd = (pss - re * qss) / denom;
    let rsd = (qss - re * pss) / denom;
    let tdo = (pv - re * qv) / denom;
    let rdo = (qv - re * pv) / denom;

    let gammasdf = (1.0 + rinf) * (j1ks - re * j2ks) / denom;
    let gammasdb = (1.0 + rinf) * (-re * j1ks + j2ks) / denom;

    let z = jfunc2(ks, ko, lai);
    let g1 = (z - j1ks * too) / (ko + m);
    let g2 = (z - j1ko * tss) / (ks + m);

    let tv1 = (vf * rinf + vb) * g1;
    let tv2 = (vf + vb * rinf) * g2;
    let t1 = tv1 * (sf + sb * rinf);
    let t2 = tv2 * (sf * rinf + sb);
    let t3 = (rdo * qss + tdo * pss) * rinf;

    // Multiple scattering contribution to the bidirectional reflectance
    let rsod = (t1 + t2 - t3) / (1.0 - rinf2);

    let t4 = tv1 * (1.0 + rinf);
    let t5 = tv2 * (1.0 + rinf);
    let t6 = (rdo * j2ks + tdo * j1ks) * (1.0 + rinf) * rinf;
    let gammasod = (t4 + t5 - t6) / (1.0 - rinf2);

    // Single scattering contribution
    let rsos = w * lai * f.sumint;
    let gammasos = ko * lai * f.sumint;

    let rso = rsos + rsod;
    let gammaso = gammasos + gammasod;

    // Interaction with the soil
    let dn = (1.0 - rsoil * rdd).max(1e-36);
    let rddt = rdd + tdd * rsoil * tdd / dn;
    let rsdt = rsd + (tsd + tss) * rsoil * tdd / dn;
    let rdot = rdo + tdd * rsoil * (tdo + too) / dn;
    let rsodt = ((tss + tsd) * tdo + (tsd + tss * rsoil * rdd) * too) * rsoil / dn;
    let rsost = rso + f.tsstoo * rsoil;
    let rsot = rsost + rsodt;

    SpectralTerms {
        rdd,
        tdd,
        rsd,
        tsd,
        rdo,
        tdo,
        rso,
        rsos,
        rsod,
        rddt,
        rsdt,
        rdot,
        rsodt,
        rsost,
        rsot,
        gammasdf,
        gammasdb,
        gammaso,
    }
}

fn bare_soil(rsoil: &[f64]) -> SailOutput {
    let zeros = vec![0.0; rsoil.len()];
    SailOutput {
        tss: 1.0,
        too: 1.0,
        tsstoo: 1.0,
        rdd: zeros.clone(),
        tdd: vec![1.0; rsoil.len()],
        rsd: zeros.clone(),
        tsd: zeros.clone(),
        rdo: zeros.clone(),
        tdo: zeros.clone(),
        rso: zeros.clone(),
        rsos: zeros.clone(),
        rsod: zeros.clone(),
        rddt: rsoil.to_vec(),
        rsdt: rsoil.to_vec(),
        rdot: rsoil.to_vec(),
        rsodt: zeros.clone(),
        rsost: rsoil.to_vec(),
        rsot: rsoil.to_vec(),
        gammasdf: zeros.clone(),
        gammasdb: zeros.clone(),
        gammaso: zeros,
    }
}

/// Runs 4SAIL for leaf optics `rho`/`tau` over a soil of reflectance `rsoil`.
pub fn foursail(
    rho: &[f64],
    tau: &[f64],
    lidf: &LeafAngleDistribution,
    lai: f64,
    hotspot: f64,
    geometry: &ViewGeometry,
    rsoil: &[f64],
) -> Result<SailOutput, SailError> {
    if rho.len() != tau.len() || rho.len() != rsoil.len() {
        return Err(SailError::LengthMismatch(format!(
            "rho = {}, tau = {}, rsoil = {}",
            rho.len(),
            tau.len(),
            rsoil.len()
        )));
    }

    if lai <= 0.0 {
        return Ok(bare_soil(rsoil));
    }

    let factors = CanopyFactors::new(&lidf.frequencies(), lai, hotspot, geometry);

    let mut output = SailOutput::with_capacity(rho.len());
    output.tss = factors.tss;
    output.too = factors.too;
    output.tsstoo = factors.tsstoo;

    for ((&r, &t), &s) in rho.iter().zip(tau).zip(rsoil) {
        output.push(canopy_terms(&factors, r, t, s, lai));
    }

    Ok(output)
}
