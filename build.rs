use std::path::Path;

fn main() {
    let catalog_path = Path::new("catalogs/cable_catalog.json");
    validate_catalog_file(catalog_path);
    set_build_dependencies();
}

fn validate_catalog_file(catalog_path: &Path) {
    // Ensure catalog exists at build time
    assert!(
        catalog_path.exists(),
        "\n\nCATALOG BUILD ERROR: File not found\n\
         Path: {}\n\
         Please create the catalog file before building.\n",
        catalog_path.display()
    );

    let catalog_contents = std::fs::read_to_string(catalog_path).unwrap_or_else(|e| {
        panic!(
            "\n\nCATALOG BUILD ERROR: Failed to read file\n\
             Path: {}\n\
             Error: {e}\n",
            catalog_path.display()
        );
    });

    let catalog: serde_json::Value = serde_json::from_str(&catalog_contents).unwrap_or_else(|e| {
        panic!(
            "\n\nCATALOG BUILD ERROR: Invalid JSON\n\
             Path: {}\n\
             Error: {e}\n\
             Hint: Check for missing commas, brackets, or invalid syntax.\n",
            catalog_path.display()
        );
    });

    validate_catalog_structure(&catalog);
}

fn validate_catalog_structure(catalog: &serde_json::Value) {
    assert!(
        catalog.is_object(),
        "\n\nCATALOG BUILD ERROR: Root must be a JSON object\n\
         Got: {catalog}\n"
    );

    assert!(
        catalog.get("version").and_then(|v| v.as_str()).is_some(),
        "\n\nCATALOG BUILD ERROR: Missing 'version' string\n"
    );

    let products = relation(catalog, "products");
    let tests = relation(catalog, "tests");

    validate_products(products);
    validate_tests(tests);

    println!(
        "cargo:warning=Validated catalog: {} products, {} tests",
        products.len(),
        tests.len()
    );
}

fn relation<'a>(catalog: &'a serde_json::Value, name: &str) -> &'a [serde_json::Value] {
    let value = catalog.get(name).unwrap_or_else(|| {
        panic!(
            "\n\nCATALOG BUILD ERROR: Missing '{name}' field\n\
             The catalog must have a top-level '{name}' array.\n"
        );
    });

    value.as_array().map(Vec::as_slice).unwrap_or_else(|| {
        panic!(
            "\n\nCATALOG BUILD ERROR: '{name}' must be an array\n\
             Got: {value}\n"
        );
    })
}

fn validate_products(products: &[serde_json::Value]) {
    let mut seen = std::collections::HashSet::new();

    for (i, product) in products.iter().enumerate() {
        let sku = product
            .get("sku")
            .and_then(|v| v.as_str())
            .unwrap_or_else(|| {
                panic!("\n\nCATALOG BUILD ERROR: Product at index {i} missing 'sku' string\n")
            });

        assert!(
            seen.insert(sku.to_string()),
            "\n\nCATALOG BUILD ERROR: Duplicate SKU '{sku}' (index {i})\n"
        );

        let price = product.get("unit_price").and_then(serde_json::Value::as_f64);
        assert!(
            price.is_some_and(|p| p >= 0.0),
            "\n\nCATALOG BUILD ERROR: Product '{sku}' (index {i}) needs a non-negative 'unit_price'\n"
        );

        assert!(
            product.get("attributes").is_some_and(serde_json::Value::is_object),
            "\n\nCATALOG BUILD ERROR: Product '{sku}' (index {i}) missing 'attributes' object\n"
        );
    }
}

fn validate_tests(tests: &[serde_json::Value]) {
    for (i, test) in tests.iter().enumerate() {
        let name = test
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("<unknown>");

        let cost = test.get("cost").and_then(serde_json::Value::as_f64);
        assert!(
            cost.is_some_and(|c| c >= 0.0),
            "\n\nCATALOG BUILD ERROR: Test '{name}' (index {i}) needs a non-negative 'cost'\n"
        );
    }
}

fn set_build_dependencies() {
    // Tell cargo to rerun if catalog changes
    println!("cargo:rerun-if-changed=catalogs/cable_catalog.json");

    // Tell cargo to rerun if build.rs changes
    println!("cargo:rerun-if-changed=build.rs");
}
