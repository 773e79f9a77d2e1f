fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure().build_server(true).build_client(true).compile_protos(
        &["proto/sso/v1/sso.proto", "proto/xcutr/v1/xcutr.proto"],
        &["proto"],
    )?;
    Ok(())
}
