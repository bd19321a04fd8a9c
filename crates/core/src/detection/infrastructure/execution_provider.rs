use ort::execution_providers::ExecutionProviderDispatch;

/// ONNX execution providers for the detector and embedder sessions, most
/// preferred first. The CPU provider is always last so session creation
/// never fails for lack of an accelerator.
pub fn preferred_execution_providers() -> Vec<ExecutionProviderDispatch> {
    let mut providers = Vec::new();
    #[cfg(target_os = "macos")]
    providers.push(ort::execution_providers::CoreMLExecutionProvider::default().build());
    #[cfg(target_os = "windows")]
    providers.push(ort::execution_providers::DirectMLExecutionProvider::default().build());
    providers.push(ort::execution_providers::CPUExecutionProvider::default().build());
    providers
}
