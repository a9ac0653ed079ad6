/*!
# automo

Tomography reconstruction automation.

The rotation center of a tomographic scan is found by reconstructing a few
slices for a series of candidate centers and picking the reconstruction with
the lowest histogram [entropy](entropy::entropy).

## Key Components

- [`image`] - TIFF and NPY slice I/O
- [`entropy`] - the focus metric, with circular masking and ring removal
- [`selector`] - minimum entropy selection over a folder of candidates
- [`sweep`] - rotation center sweep planning
- [`folder`] - folder name cleaning and file helpers
- `dataset` - HDF5 dataset inspection (`hdf5` feature)

## Usage

```rust,no_run
use automo::{minimum_entropy, sweep::center_from_path, EntropyConfig};

let config = EntropyConfig::default().range(0., 0.002).mask_ratio(Some(0.9));
let best = minimum_entropy("center/1024", "*.tiff", &config)?;
println!("rotation center: {}", center_from_path(&best)?);
# Ok::<(), automo::Error>(())
```
*/

#[cfg(feature = "hdf5")]
pub mod dataset;
pub mod entropy;
mod error;
pub mod folder;
pub mod image;
pub mod selector;
pub mod sweep;

pub use entropy::{entropy, EntropyConfig, Window};
pub use error::Error;
pub use image::{read_image, Image};
pub use selector::{minimum_entropy, MinimumEntropy};
