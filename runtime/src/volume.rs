use ers_types::VolumeName;

use crate::{ContainerRuntime, FailureClass, RuntimeError, args};

/// Create the named index volume unless it already exists.
///
/// Safe to call from concurrent activations: a volume created by someone
/// else between our check and our create is still a success.
pub async fn ensure_volume(
    runtime: &dyn ContainerRuntime,
    volume: &VolumeName,
) -> Result<(), RuntimeError> {
    match runtime
        .exec(&args(["volume", "create", volume.as_str()]))
        .await
    {
        Ok(_) => {
            tracing::debug!(volume = %volume, "Volume ready");
            Ok(())
        }
        Err(err) if err.classify() == FailureClass::AlreadyExists => {
            tracing::debug!(volume = %volume, "Volume already exists");
            Ok(())
        }
        Err(err) => Err(err),
    }
}
