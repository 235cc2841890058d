use anyhow::{anyhow, bail, Result};
use candle_core::Device;

/// Parsed form of the `device` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSpec {
    Cpu,
    Cuda(usize),
    Metal(usize),
    /// First available accelerator, else CPU.
    Auto,
}

impl DeviceSpec {
    /// Accepts `cpu`, `auto`, `cuda`, `cuda:N`, `metal`, `metal:N` (also `mps`).
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim().to_ascii_lowercase();
        let (kind, ordinal) = match spec.split_once(':') {
            Some((kind, n)) => {
                let n = n.parse::<usize>().map_err(|_| anyhow!("invalid device ordinal in {spec:?}"))?;
                (kind.to_string(), n)
            }
            None => (spec.clone(), 0),
        };
        match kind.as_str() {
            "cpu" => Ok(Self::Cpu),
            "auto" => Ok(Self::Auto),
            "cuda" | "gpu" => Ok(Self::Cuda(ordinal)),
            "metal" | "mps" => Ok(Self::Metal(ordinal)),
            _ => bail!("unknown device {spec:?}; expected cpu, cuda[:N], metal[:N] or auto"),
        }
    }
}

pub fn select_device(spec: DeviceSpec) -> Result<Device> {
    match spec {
        DeviceSpec::Cpu => Ok(Device::Cpu),
        DeviceSpec::Cuda(n) => Device::new_cuda(n).map_err(|e| anyhow!("CUDA device {n} unavailable: {e}")),
        DeviceSpec::Metal(n) => Device::new_metal(n).map_err(|e| anyhow!("Metal device {n} unavailable: {e}")),
        DeviceSpec::Auto => {
            if candle_core::utils::cuda_is_available() {
                match Device::new_cuda(0) {
                    Ok(dev) => return Ok(dev),
                    Err(e) => tracing::warn!("CUDA available but initialization failed: {e}; using CPU"),
                }
            }
            if candle_core::utils::metal_is_available() {
                match Device::new_metal(0) {
                    Ok(dev) => return Ok(dev),
                    Err(e) => tracing::warn!("Metal available but initialization failed: {e}; using CPU"),
                }
            }
            Ok(Device::Cpu)
        }
    }
}
