//! Numeric side of the grapher: camera, sampling, background computes, the scene and
//! pointer queries.
/// camera state and world/screen mapping
pub mod coordinates;
/// sampling compiled branches into screen-space point arrays
pub mod sampler;
/// derivatives of solved branches, including the piecewise derivative of `abs`
pub mod derivative;
/// named numeric parameters
pub mod variables;
/// rayon pool running solve-and-compile jobs, results over a channel
pub mod compute;
/// one user-authored relation with its edit/compute state machine
pub mod expression;
/// nearest point, tangent and mouse readouts
pub mod hover;
/// frame loop owning the camera, variables and expressions
pub mod scene;
